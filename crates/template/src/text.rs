//! Text templates with placeholder tokens and optional blocks

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use relaykit_core::replace_file;

use crate::{Result, TemplateError};

/// Name of the optional reverse-proxy sidecar block.
pub const RELAY_BLOCK: &str = "relay-sidecar";
/// Start marker line of the sidecar block.
pub const RELAY_BLOCK_START: &str = "# >>> relay-sidecar";
/// End marker line of the sidecar block.
pub const RELAY_BLOCK_END: &str = "# <<< relay-sidecar";

/// A text configuration template.
///
/// Placeholders are angle-bracket tokens (`<UPSTREAM-UUID>`); optional
/// units are bounded by explicit start/end markers. Block removal only
/// ever deletes the exact delimited span, so content positioned around
/// the markers can never be consumed by accident.
#[derive(Debug, Clone)]
pub struct TextTemplate {
    content: String,
}

impl TextTemplate {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Load a template from `path`; a missing file is `MissingFile`.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Self::new(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(TemplateError::MissingFile(path.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Replace every occurrence of each token with its value.
    ///
    /// Re-running against an already-resolved document is a no-op.
    pub fn substitute(&mut self, values: &[(&str, &str)]) {
        for (token, value) in values {
            if self.content.contains(token) {
                debug!("Substituting {token}");
                self.content = self.content.replace(token, value);
            }
        }
    }

    /// Token-shaped substrings still present in the template.
    pub fn unresolved_tokens(&self) -> Vec<String> {
        find_tokens(&self.content)
    }

    /// Remove the span from `start` through `end`, markers included.
    ///
    /// An absent block is a no-op (removal is idempotent); a start
    /// marker without its end marker is an error. Everything outside
    /// the markers is preserved byte for byte.
    pub fn remove_block(&mut self, name: &str, start: &str, end: &str) -> Result<()> {
        let Some(from) = self.content.find(start) else {
            return Ok(());
        };
        let search_from = from + start.len();
        let Some(offset) = self.content[search_from..].find(end) else {
            return Err(TemplateError::UnterminatedBlock(name.to_string()));
        };
        let to = search_from + offset + end.len();
        debug!("Removing block '{name}' ({} bytes)", to - from);
        self.content.replace_range(from..to, "");
        Ok(())
    }

    /// Keep a block's content but drop the marker strings themselves.
    pub fn strip_block_markers(&mut self, start: &str, end: &str) {
        self.content = self.content.replace(start, "");
        self.content = self.content.replace(end, "");
    }

    /// Finish rendering.
    ///
    /// Any remaining token-shaped text fails with
    /// `UnresolvedPlaceholder`; an incomplete document must never be
    /// mistaken for a finished one.
    pub fn into_rendered(self) -> Result<String> {
        if let Some(token) = find_tokens(&self.content).into_iter().next() {
            return Err(TemplateError::UnresolvedPlaceholder(token));
        }
        Ok(self.content)
    }

    /// Render and persist to `path` (backup + temp + rename).
    pub fn save(self, path: &Path) -> Result<()> {
        let rendered = self.into_rendered()?;
        replace_file(path, &rendered)?;
        Ok(())
    }
}

/// Scan for token-shaped substrings.
///
/// A token is `<NAME>` where NAME is one or more uppercase ASCII
/// letters, digits, `-`, `_` or `.` characters.
pub fn find_tokens(content: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let bytes = content.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'<' {
            if let Some(offset) = content[i + 1..].find(|c| c == '<' || c == '>') {
                let j = i + 1 + offset;
                if bytes[j] == b'>' && j > i + 1 {
                    let inner = &content[i + 1..j];
                    if inner.bytes().all(is_token_byte) {
                        tokens.push(content[i..=j].to_string());
                        i = j + 1;
                        continue;
                    }
                }
            }
        }
        i += 1;
    }
    tokens
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'-' || b == b'_' || b == b'.'
}
