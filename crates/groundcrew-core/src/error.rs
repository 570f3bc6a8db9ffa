//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(
        "deterministic name candidates exhausted for {kind} after {attempts} attempts; \
         re-run with --timestamp-fallback to allow a non-deterministic name"
    )]
    NameExhausted { kind: String, attempts: usize },

    #[error("invalid tag '{0}' (expected key=value)")]
    InvalidTag(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
