//! Error types for reset-engine operations.

use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResetError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("Wrong instant kind: {0}")]
    WrongInstantKind(String),

    #[error("Nonexistent local time {local} in {zone} (DST gap)")]
    NonexistentLocalTime { local: NaiveDateTime, zone: String },

    #[error("Ambiguous local time {local} in {zone} (DST overlap)")]
    AmbiguousLocalTime { local: NaiveDateTime, zone: String },

    #[error("Search exhausted: {0}")]
    SearchExhausted(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Locality mismatch: {0}")]
    LocalityMismatch(String),
}

pub type Result<T> = std::result::Result<T, ResetError>;
