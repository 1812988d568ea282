pub mod use_cases;

pub use use_cases::csv_importer::CsvImporter;
pub use use_cases::import_runner::ImportRunner;
