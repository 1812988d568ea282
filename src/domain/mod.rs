pub mod error;

// CSV ingestion domain
pub mod csv;
