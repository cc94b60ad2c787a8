//! RelayKit Key Material
//!
//! Generates the short hex identifier locally and obtains X25519 key
//! material from an external key tool, parsing its stdout by line
//! pattern. Tool calls are synchronous and never retried; a failed
//! call aborts the configuration run.

mod tool;

pub use tool::{parse_key_output, KeyPairOutput, KeyTool};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeygenError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    ToolFailed {
        program: String,
        status: std::process::ExitStatus,
    },

    #[error("Expected '{0}' line not found in key tool output")]
    MissingPattern(&'static str),
}

pub type Result<T> = std::result::Result<T, KeygenError>;

/// Generate a short hex identifier (8 random bytes).
///
/// Independent of the client identifiers; used for TLS-camouflage
/// domain fronting.
pub fn generate_short_id() -> String {
    hex::encode(rand::random::<[u8; 8]>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id_is_eight_hex_bytes() {
        let id = generate_short_id();
        assert_eq!(id.len(), 16);
        assert!(id.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn test_short_ids_are_independent() {
        assert_ne!(generate_short_id(), generate_short_id());
    }
}
