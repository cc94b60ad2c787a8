//! RelayKit Template Engine
//!
//! Materializes proxy configuration files from templates: placeholder
//! substitution over text documents, marker-delimited optional blocks,
//! and a structured JSON document model with guarded field replacement.
//!
//! A document is only considered complete when no token-shaped text
//! remains; saving an incomplete document fails instead of silently
//! producing an invalid production config.

mod document;
mod text;

pub use document::{Applied, ConfigDocument};
pub use text::{find_tokens, TextTemplate, RELAY_BLOCK, RELAY_BLOCK_END, RELAY_BLOCK_START};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template file not found: {0}")]
    MissingFile(PathBuf),

    #[error("Unresolved placeholder {0} remains after substitution")]
    UnresolvedPlaceholder(String),

    #[error("Block '{0}' has a start marker but no end marker")]
    UnterminatedBlock(String),

    #[error("Config field missing: {0}")]
    MissingField(String),

    #[error("Invalid config document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TemplateError>;
