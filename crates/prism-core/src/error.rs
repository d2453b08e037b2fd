use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Protocol errors
    #[error("Invalid fingerprint identifier: {0}")]
    InvalidFingerprintId(String),

    #[error("Unknown operation kind: {0}")]
    UnknownOperation(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
