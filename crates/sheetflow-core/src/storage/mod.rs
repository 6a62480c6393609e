//! Persistence for tables.

pub mod csv;

pub use csv::{read_header, read_table, write_table};
