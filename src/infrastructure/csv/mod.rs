// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Tokenizing, record assembly, value normalization and type inference

mod column_analyzer;
mod record_assembler;
mod reject_writer;
mod tokenizer;
mod value_normalizer;

pub use column_analyzer::{ColumnAnalyzer, ColumnProfile};
pub use record_assembler::{AssembledRecord, RecordAssembler};
pub use reject_writer::RejectWriter;
pub use tokenizer::Tokenizer;
pub use value_normalizer::{NormalizedRow, ValueNormalizer};
