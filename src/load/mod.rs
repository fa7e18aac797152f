// src/load/mod.rs

pub mod csv_file;
pub mod sqlite;

pub use csv_file::{read_csv, write_csv};
pub use sqlite::{open_database, validate_table_name, write_table};
