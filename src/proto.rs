pub mod codec;
pub mod command;
pub mod transport;

#[cfg(test)]
pub mod fake;

use std::num::ParseFloatError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtoError {
    #[error("I/O error: {:?}", _0)]
    Io(#[from] std::io::Error),

    #[error("Serial I/O error: {:?}", _0)]
    Serial(#[from] tokio_serial::Error),

    #[error("Port is not open")]
    NotOpen,
    #[error("Port is already open")]
    AlreadyOpen,
    #[error("Connection was closed")]
    Abort,

    #[error("Could not convert {text:?} to a number: {source}")]
    ParseFloat {
        text: String,
        source: ParseFloatError,
    },
    #[error("Unknown parameter code: {:?}", _0)]
    UnknownParameter(String),
    #[error("Unknown parameter label: {:?}", _0)]
    UnknownLabel(String),
    #[error("Unknown measurement mode: {:?}", _0)]
    UnknownMode(String),
    #[error("Unknown measurement speed: {:?}", _0)]
    UnknownSpeed(String),

    #[error("Configuration error: {}", _0)]
    Config(#[from] config::ConfigError),
    #[error("Invalid setting: {}", _0)]
    InvalidSetting(String),
}

pub type Result<T> = std::result::Result<T, ProtoError>;

/// Parses a comma separated reply line into numbers.
///
/// Every field must be numeric; an empty reply is an error.
pub fn parse_values(text: &str) -> Result<Vec<f64>> {
    text.split(',').map(parse_value).collect()
}

pub fn parse_value(text: &str) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|source| ProtoError::ParseFloat {
            text: text.to_string(),
            source,
        })
}
