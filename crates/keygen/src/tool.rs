//! External key-tool invocation

use std::process::Command;

use tracing::{debug, info};

use crate::{KeygenError, Result};

const PRIVATE_PREFIX: &str = "Private key:";
const PUBLIC_PREFIX: &str = "Public key:";

/// Key material extracted from the tool's stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPairOutput {
    pub private_key: String,
    pub public_key: String,
}

/// A synchronous external key-generation command.
///
/// The tool is an opaque collaborator: only its exit status and the
/// `Private key:` / `Public key:` stdout lines matter.
#[derive(Debug, Clone)]
pub struct KeyTool {
    program: String,
    args: Vec<String>,
}

impl KeyTool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// The stock proxy-core generator (`xray x25519`).
    pub fn xray() -> Self {
        Self::new("xray").arg("x25519")
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the tool and extract the keypair from its stdout.
    ///
    /// A non-zero exit status or an absent output pattern is a clean
    /// error, never a panic.
    pub fn generate(&self) -> Result<KeyPairOutput> {
        debug!("Running key tool: {} {:?}", self.program, self.args);
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|source| KeygenError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(KeygenError::ToolFailed {
                program: self.program.clone(),
                status: output.status,
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let keys = parse_key_output(&stdout)?;
        info!("Key tool produced X25519 material");
        Ok(keys)
    }
}

/// Extract the `Private key:` / `Public key:` lines from tool output.
pub fn parse_key_output(stdout: &str) -> Result<KeyPairOutput> {
    let private_key =
        find_value(stdout, PRIVATE_PREFIX).ok_or(KeygenError::MissingPattern(PRIVATE_PREFIX))?;
    let public_key =
        find_value(stdout, PUBLIC_PREFIX).ok_or(KeygenError::MissingPattern(PUBLIC_PREFIX))?;
    Ok(KeyPairOutput {
        private_key,
        public_key,
    })
}

fn find_value(stdout: &str, prefix: &str) -> Option<String> {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix(prefix).map(|rest| rest.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_output() {
        let stdout = "Private key: cLwKcnV0aGVyZm9yZC1oYXllcy1wbGF5\nPublic key: bFN0cmF0Zm9yZC11cG9uLWF2b24tbG9s\n";
        let keys = parse_key_output(stdout).unwrap();
        assert_eq!(keys.private_key, "cLwKcnV0aGVyZm9yZC1oYXllcy1wbGF5");
        assert_eq!(keys.public_key, "bFN0cmF0Zm9yZC11cG9uLWF2b24tbG9s");
    }

    #[test]
    fn test_parse_tolerates_banner_lines_and_whitespace() {
        let stdout = "xray 1.8.0\n\nPrivate key:   priv  \nPublic key: pub\nDone.\n";
        let keys = parse_key_output(stdout).unwrap();
        assert_eq!(keys.private_key, "priv");
        assert_eq!(keys.public_key, "pub");
    }

    #[test]
    fn test_missing_private_pattern() {
        let err = parse_key_output("Public key: pub\n").unwrap_err();
        assert!(matches!(err, KeygenError::MissingPattern(p) if p.starts_with("Private")));
    }

    #[test]
    fn test_missing_public_pattern() {
        let err = parse_key_output("Private key: priv\n").unwrap_err();
        assert!(matches!(err, KeygenError::MissingPattern(p) if p.starts_with("Public")));
    }

    #[test]
    fn test_spawn_failure_is_clean_error() {
        let err = KeyTool::new("relaykit-no-such-tool").generate().unwrap_err();
        assert!(matches!(err, KeygenError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_generate_parses_real_subprocess_output() {
        let keys = KeyTool::new("sh")
            .arg("-c")
            .arg("printf 'Private key: priv\\nPublic key: pub\\n'")
            .generate()
            .unwrap();
        assert_eq!(keys.private_key, "priv");
        assert_eq!(keys.public_key, "pub");
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_tool_failed() {
        let err = KeyTool::new("sh").arg("-c").arg("exit 3").generate().unwrap_err();
        assert!(matches!(err, KeygenError::ToolFailed { .. }));
    }
}
