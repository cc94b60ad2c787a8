//! Deployment file locations
//!
//! Every operation receives its paths explicitly through this struct;
//! there are no module-level defaults and no working-directory lookups.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// File locations of one deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployPaths {
    /// Proxy server configuration file (JSON document or token template)
    pub config: PathBuf,

    /// Reverse-proxy / edge configuration file, when one is deployed
    #[serde(default)]
    pub edge_config: Option<PathBuf>,

    /// Directory receiving audit records for generated material
    pub audit_dir: PathBuf,
}

impl DeployPaths {
    pub fn new(config: impl Into<PathBuf>, audit_dir: impl Into<PathBuf>) -> Self {
        Self {
            config: config.into(),
            edge_config: None,
            audit_dir: audit_dir.into(),
        }
    }

    pub fn with_edge_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.edge_config = Some(path.into());
        self
    }

    /// Path of an audit record inside the audit directory.
    pub fn audit_file(&self, name: &str) -> PathBuf {
        self.audit_dir.join(name)
    }
}

impl AsRef<Path> for DeployPaths {
    fn as_ref(&self) -> &Path {
        &self.config
    }
}
