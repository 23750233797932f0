use thiserror::Error;

use crate::store::error::StoreError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Partition count must be at least 1, got {0}")]
    InvalidPartitionCount(u32),

    #[error(
        "Configuration mismatch: {descriptors} partition descriptors, {targets} worker targets, \
         {records} execution records"
    )]
    ConfigurationMismatch {
        descriptors: usize,
        targets: usize,
        records: usize,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
