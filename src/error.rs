//! Error types for Aurica

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuricaError {
    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Audio format error: {0}")]
    Format(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, AuricaError>;
