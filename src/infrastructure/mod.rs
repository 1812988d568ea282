pub mod config;
pub mod csv;
pub mod db;
pub mod source;
