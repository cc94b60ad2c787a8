//! Topology mode and deployment parameters

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ParameterError {
    #[error("Invalid identifier for {label}: '{value}' is not a UUID")]
    InvalidIdentifier { label: String, value: String },

    #[error("Outbound domain is required in {0} mode")]
    MissingOutboundDomain(TopologyMode),

    #[error("Direct mode requires an empty outbound domain (got '{0}')")]
    UnexpectedOutboundDomain(String),

    #[error("Direct mode requires matching upstream and bridge identifiers")]
    MismatchedIdentifiers,

    #[error("Unknown topology mode: {0}")]
    UnknownMode(String),
}

pub type Result<T> = std::result::Result<T, ParameterError>;

/// Deployment topology shape.
///
/// Chosen once per configuration run and immutable for its lifetime.
/// The mode decides which identifiers and domains are required and
/// whether the reverse-proxy sidecar block survives templating:
///
/// | mode   | upstream/bridge id          | outbound domain    | sidecar block |
/// |--------|-----------------------------|--------------------|---------------|
/// | direct | forced equal, single prompt | forced empty       | removed       |
/// | bridge | independent or shared       | required non-empty | kept          |
/// | relay  | independent or shared       | required non-empty | kept          |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopologyMode {
    /// Single node; clients connect straight to the upstream
    Direct,
    /// Bridge node forwarding to a separate upstream
    Bridge,
    /// Bridge plus an extra relay hop in front of the upstream
    Relay,
}

impl TopologyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Bridge => "bridge",
            Self::Relay => "relay",
        }
    }

    /// Whether an outbound target domain must be resolved for this mode.
    pub fn requires_outbound_domain(&self) -> bool {
        !matches!(self, Self::Direct)
    }

    /// Whether upstream and bridge share a single client identity.
    pub fn shares_client_identity(&self) -> bool {
        matches!(self, Self::Direct)
    }

    /// Whether the optional reverse-proxy sidecar block stays in the
    /// rendered configuration.
    pub fn keeps_relay_block(&self) -> bool {
        !matches!(self, Self::Direct)
    }
}

impl fmt::Display for TopologyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopologyMode {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "direct" => Ok(Self::Direct),
            "bridge" => Ok(Self::Bridge),
            "relay" => Ok(Self::Relay),
            other => Err(ParameterError::UnknownMode(other.to_string())),
        }
    }
}

/// Check a string against the canonical UUID textual grammar.
pub fn is_valid_identifier(s: &str) -> bool {
    Uuid::parse_str(s).is_ok()
}

/// Generate a fresh random (v4) identifier.
pub fn generate_identifier() -> String {
    Uuid::new_v4().to_string()
}

/// Placeholder tokens recognized in configuration templates.
///
/// Each logical field has exactly one token spelling; the template
/// engine maps tokens to fields through
/// [`DeploymentParameters::token_values`].
pub mod tokens {
    pub const UPSTREAM_UUID: &str = "<UPSTREAM-UUID>";
    pub const BRIDGE_UUID: &str = "<BRIDGE-UUID>";
    pub const OUTBOUND_DOMAIN: &str = "<OUTBOUND-DOMAIN>";
    pub const PUBLIC_DOMAIN: &str = "<PUBLIC-DOMAIN>";
    pub const CERT_FILE: &str = "<CERT-FILE>";
    pub const KEY_FILE: &str = "<KEY-FILE>";
    pub const PRIVATE_KEY: &str = "<PRIVATE-KEY>";
    pub const PUBLIC_KEY: &str = "<PUBLIC-KEY>";
    pub const SHORT_ID: &str = "<SHORT-ID>";
}

/// Parameters of one deployment configuration run.
///
/// Created once per run from prompts or flags, consumed by the template
/// engine and the link exporter, then discarded. Generated identifiers
/// are persisted separately as audit records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentParameters {
    /// Topology mode for this run
    pub mode: TopologyMode,

    /// Client identifier on the upstream node
    pub upstream_id: String,

    /// Client identifier on the bridge node
    pub bridge_id: String,

    /// Domain the bridge forwards to; empty in direct mode
    #[serde(default)]
    pub outbound_domain: String,

    /// Publicly reachable domain of this deployment
    #[serde(default)]
    pub public_domain: String,

    /// TLS certificate file path baked into the config
    #[serde(default)]
    pub tls_cert_path: String,

    /// TLS key file path baked into the config
    #[serde(default)]
    pub tls_key_path: String,

    /// X25519 private key for TLS-camouflage transports
    #[serde(default)]
    pub x25519_private_key: String,

    /// X25519 public key for TLS-camouflage transports
    #[serde(default)]
    pub x25519_public_key: String,

    /// Short hex identifier for domain fronting
    #[serde(default)]
    pub short_id: String,
}

impl DeploymentParameters {
    /// Empty parameter set for `mode`.
    pub fn new(mode: TopologyMode) -> Self {
        Self {
            mode,
            upstream_id: String::new(),
            bridge_id: String::new(),
            outbound_domain: String::new(),
            public_domain: String::new(),
            tls_cert_path: String::new(),
            tls_key_path: String::new(),
            x25519_private_key: String::new(),
            x25519_public_key: String::new(),
            short_id: String::new(),
        }
    }

    /// Force the mode invariants.
    ///
    /// Direct mode shares a single client identity and never has an
    /// outbound domain, regardless of what was supplied for each.
    pub fn apply_mode_policy(&mut self) {
        if self.mode.shares_client_identity() {
            self.bridge_id = self.upstream_id.clone();
            self.outbound_domain.clear();
        }
    }

    /// Validate the resolved parameter set before it is used.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_identifier(&self.upstream_id) {
            return Err(ParameterError::InvalidIdentifier {
                label: "upstream".to_string(),
                value: self.upstream_id.clone(),
            });
        }
        if !is_valid_identifier(&self.bridge_id) {
            return Err(ParameterError::InvalidIdentifier {
                label: "bridge".to_string(),
                value: self.bridge_id.clone(),
            });
        }
        if self.mode.shares_client_identity() {
            if self.upstream_id != self.bridge_id {
                return Err(ParameterError::MismatchedIdentifiers);
            }
            if !self.outbound_domain.is_empty() {
                return Err(ParameterError::UnexpectedOutboundDomain(
                    self.outbound_domain.clone(),
                ));
            }
        } else if self.outbound_domain.is_empty() {
            return Err(ParameterError::MissingOutboundDomain(self.mode));
        }
        Ok(())
    }

    /// Fixed token-to-field mapping consumed by the template engine.
    pub fn token_values(&self) -> Vec<(&'static str, &str)> {
        vec![
            (tokens::UPSTREAM_UUID, self.upstream_id.as_str()),
            (tokens::BRIDGE_UUID, self.bridge_id.as_str()),
            (tokens::OUTBOUND_DOMAIN, self.outbound_domain.as_str()),
            (tokens::PUBLIC_DOMAIN, self.public_domain.as_str()),
            (tokens::CERT_FILE, self.tls_cert_path.as_str()),
            (tokens::KEY_FILE, self.tls_key_path.as_str()),
            (tokens::PRIVATE_KEY, self.x25519_private_key.as_str()),
            (tokens::PUBLIC_KEY, self.x25519_public_key.as_str()),
            (tokens::SHORT_ID, self.short_id.as_str()),
        ]
    }
}
