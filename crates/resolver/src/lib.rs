//! RelayKit Parameter Resolver
//!
//! Gathers and validates deployment parameters: topology mode, client
//! identifiers, and domains. All answers come through the pluggable
//! [`InputProvider`], so the resolution rules run identically against a
//! terminal or a scripted answer queue.
//!
//! Malformed answers are recovered locally by re-prompting; only a
//! closed input stream or a failed audit write aborts resolution.

mod input;
mod resolve;

pub use input::{InputProvider, ScriptedInput, StdinInput};
pub use resolve::{validate_identifier, ParameterResolver};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Invalid identifier format: {0}")]
    InvalidFormat(String),

    #[error("Failed to record generated identifier: {0}")]
    AuditWrite(std::io::Error),

    #[error("Input error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ResolveError>;
