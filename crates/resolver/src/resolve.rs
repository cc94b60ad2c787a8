//! Resolution rules for identifiers, modes, and domains

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{info, warn};

use relaykit_core::{
    generate_identifier, is_valid_identifier, DeploymentParameters, TopologyMode,
};

use crate::input::InputProvider;
use crate::{ResolveError, Result};

/// Validate a caller-supplied identifier without prompting.
pub fn validate_identifier(label: &str, value: &str) -> Result<()> {
    if is_valid_identifier(value) {
        Ok(())
    } else {
        Err(ResolveError::InvalidFormat(format!("{label}: '{value}'")))
    }
}

/// Resolves deployment parameters from an [`InputProvider`].
///
/// Invalid answers are rejected and re-prompted; nothing is ever
/// defaulted silently.
pub struct ParameterResolver<'a> {
    input: &'a mut dyn InputProvider,
    audit_dir: Option<PathBuf>,
}

impl<'a> ParameterResolver<'a> {
    pub fn new(input: &'a mut dyn InputProvider) -> Self {
        Self {
            input,
            audit_dir: None,
        }
    }

    /// Record generated identifiers as audit files under `dir`.
    pub fn with_audit_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.audit_dir = Some(dir.into());
        self
    }

    /// Resolve one client identifier.
    ///
    /// Empty input keeps a valid `existing_default` unchanged, or
    /// generates a fresh identifier when there is none (recorded to
    /// `<label>_generated_uuid.txt`). Non-empty input must satisfy the
    /// UUID grammar; anything else re-prompts.
    pub fn resolve_identifier(&mut self, label: &str, existing_default: &str) -> Result<String> {
        let default = if is_valid_identifier(existing_default) {
            existing_default
        } else {
            ""
        };
        let hint = if default.is_empty() {
            "generate one"
        } else {
            "keep the current one"
        };
        let prompt = format!("UUID for {label} (leave empty to {hint})");

        loop {
            let answer = self.input.ask(&prompt, default)?;
            if answer.is_empty() {
                if !default.is_empty() {
                    return Ok(default.to_string());
                }
                let generated = generate_identifier();
                info!("Generated identifier for {label}: {generated}");
                self.record_generated(label, &generated)?;
                return Ok(generated);
            }
            if is_valid_identifier(&answer) {
                return Ok(answer);
            }
            warn!("Invalid UUID for {label}: '{answer}', try again");
        }
    }

    /// Resolve the topology mode by exact set membership.
    pub fn resolve_mode(&mut self) -> Result<TopologyMode> {
        loop {
            let answer = self.input.ask("Topology mode (direct/bridge/relay)", "")?;
            match TopologyMode::from_str(&answer) {
                Ok(mode) => return Ok(mode),
                Err(_) => warn!("Unknown topology mode: '{answer}', try again"),
            }
        }
    }

    /// Resolve a domain.
    ///
    /// The outbound domain is forced empty in direct mode; every other
    /// domain must be non-empty.
    pub fn resolve_domain(
        &mut self,
        context: &str,
        mode: TopologyMode,
        outbound: bool,
    ) -> Result<String> {
        if outbound && !mode.requires_outbound_domain() {
            return Ok(String::new());
        }
        loop {
            let answer = self
                .input
                .ask(&format!("{context} (e.g. us1.example.com)"), "")?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            warn!("Empty input; {context} is required");
        }
    }

    /// Full mode-policy resolution flow.
    ///
    /// Direct mode resolves a single shared identifier; bridge and relay
    /// offer the choice of one identifier for both nodes or independent
    /// ones, then require an outbound domain.
    pub fn resolve_parameters(&mut self, mode: TopologyMode) -> Result<DeploymentParameters> {
        let mut params = DeploymentParameters::new(mode);

        if mode.shares_client_identity() {
            let shared = self.resolve_identifier("node", "")?;
            params.upstream_id = shared.clone();
            params.bridge_id = shared;
        } else if self
            .input
            .confirm("Use the same UUID for both bridge and upstream? (y/n)")?
        {
            let shared = self.resolve_identifier("common", "")?;
            params.upstream_id = shared.clone();
            params.bridge_id = shared;
        } else {
            params.upstream_id = self.resolve_identifier("upstream", "")?;
            params.bridge_id = self.resolve_identifier("bridge", "")?;
        }

        params.outbound_domain = self.resolve_domain("Outbound domain", mode, true)?;
        params.public_domain = self.resolve_domain("Public domain", mode, false)?;
        params.apply_mode_policy();
        Ok(params)
    }

    fn record_generated(&self, label: &str, id: &str) -> Result<()> {
        let Some(dir) = &self.audit_dir else {
            return Ok(());
        };
        fs::create_dir_all(dir).map_err(ResolveError::AuditWrite)?;
        let path = dir.join(format!("{label}_generated_uuid.txt"));
        fs::write(&path, id).map_err(ResolveError::AuditWrite)?;
        info!("Recorded generated identifier at {}", path.display());
        Ok(())
    }
}
