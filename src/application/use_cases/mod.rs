pub mod batch_loader;
pub mod csv_importer;
pub mod import_runner;
pub mod schema_aligner;
