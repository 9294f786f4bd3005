/// This module provides the CSV record reader and writer behind `CsvFile`.
pub mod csv;
