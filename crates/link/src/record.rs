//! Canonical connection-link record

use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_VERSION: &str = "2";
pub(crate) const DEFAULT_AUX_ID: &str = "0";
pub(crate) const DEFAULT_HEADER_TYPE: &str = "none";

/// Everything a client needs to reach a proxy endpoint.
///
/// Always derived from the persisted configuration and regenerated on
/// demand; a link is an export artifact, never the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionLink {
    /// Protocol version ("2")
    pub version: String,
    /// Display name shown by client apps
    pub name: String,
    /// Server address (domain or IP)
    pub address: String,
    /// Server port
    pub port: u16,
    /// Client identifier (UUID)
    pub id: String,
    /// Auxiliary id ("0" when unused)
    pub aux_id: String,
    /// Transport network (e.g. "ws", "tcp")
    pub network: String,
    /// Obfuscation header type ("none" when unused)
    pub header_type: String,
    /// Host header; empty when the transport is not fronted
    pub host: String,
    /// Transport path (e.g. "/ws"); empty when unused
    pub path: String,
    /// TLS mode (e.g. "tls", "reality", "none")
    pub security: String,
}

impl ConnectionLink {
    /// Record with the fixed protocol defaults filled in.
    pub fn new(address: impl Into<String>, port: u16, id: impl Into<String>) -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            name: String::new(),
            address: address.into(),
            port,
            id: id.into(),
            aux_id: DEFAULT_AUX_ID.to_string(),
            network: "tcp".to_string(),
            header_type: DEFAULT_HEADER_TYPE.to_string(),
            host: String::new(),
            path: String::new(),
            security: "none".to_string(),
        }
    }
}
