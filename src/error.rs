use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
/// CSV file error
pub enum CsvFileError {
    #[error("Failed to open file '{}': {}", .path.display(), .source)]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("ItemWriter from: {0}")]
    ItemWriter(String),

    #[error("ItemReader from: {0}")]
    ItemReader(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}
