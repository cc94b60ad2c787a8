//! Structured JSON configuration documents
//!
//! Field updates are guarded: a value that already holds resolved
//! production material is never silently replaced by a freshly
//! generated one. Callers get a [`Applied::WouldReplace`] back and must
//! confirm explicitly before forcing the write.

use std::fs;
use std::io;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use relaykit_core::replace_file;

use crate::{Result, TemplateError};

/// Outcome of a guarded field update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// The value was written (the field held a placeholder, was empty,
    /// or `force` was set)
    Updated,
    /// The field already held exactly this value
    Unchanged,
    /// The field holds a different, already-resolved value; refused
    /// without `force`
    WouldReplace { existing: String },
}

/// A parsed proxy configuration document.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    root: Value,
}

impl ConfigDocument {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self {
            root: serde_json::from_str(text)?,
        })
    }

    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// Load a document from `path`; a missing file is `MissingFile`.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(TemplateError::MissingFile(path.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Identifier of the first client under inbound `idx`.
    pub fn client_id(&self, idx: usize) -> Option<&str> {
        self.str_at(&format!("/inbounds/{idx}/settings/clients/0/id"))
    }

    /// Guarded write of the client identifier under inbound `idx`.
    pub fn set_client_id(&mut self, idx: usize, id: &str, force: bool) -> Result<Applied> {
        self.guarded_set(
            &format!("/inbounds/{idx}/settings/clients/0/id"),
            &format!("inbounds[{idx}].settings.clients[0].id"),
            id,
            force,
        )
    }

    /// First vnext target address of outbound `idx`.
    pub fn outbound_address(&self, idx: usize) -> Option<&str> {
        self.str_at(&format!("/outbounds/{idx}/settings/vnext/0/address"))
    }

    /// Guarded write of the vnext target address of outbound `idx`.
    pub fn set_outbound_address(&mut self, idx: usize, address: &str, force: bool) -> Result<Applied> {
        self.guarded_set(
            &format!("/outbounds/{idx}/settings/vnext/0/address"),
            &format!("outbounds[{idx}].settings.vnext[0].address"),
            address,
            force,
        )
    }

    /// Transport network of inbound `idx` (e.g. "ws").
    pub fn stream_network(&self, idx: usize) -> Option<&str> {
        self.str_at(&format!("/inbounds/{idx}/streamSettings/network"))
    }

    /// Stream security of inbound `idx` (e.g. "tls").
    pub fn stream_security(&self, idx: usize) -> Option<&str> {
        self.str_at(&format!("/inbounds/{idx}/streamSettings/security"))
    }

    /// WebSocket path of inbound `idx`, when the transport is ws.
    pub fn ws_path(&self, idx: usize) -> Option<&str> {
        self.str_at(&format!("/inbounds/{idx}/streamSettings/wsSettings/path"))
    }

    /// Guarded write of the TLS certificate/key file paths of inbound
    /// `idx`. Neither field is written when either would replace a
    /// resolved value without `force`.
    pub fn set_tls_files(
        &mut self,
        idx: usize,
        cert_file: &str,
        key_file: &str,
        force: bool,
    ) -> Result<Applied> {
        let cert_ptr = format!("/inbounds/{idx}/streamSettings/tlsSettings/certificates/0/certificateFile");
        let key_ptr = format!("/inbounds/{idx}/streamSettings/tlsSettings/certificates/0/keyFile");

        for (ptr, new) in [(&cert_ptr, cert_file), (&key_ptr, key_file)] {
            let existing = self
                .root
                .pointer(ptr)
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    TemplateError::MissingField(format!(
                        "inbounds[{idx}].streamSettings.tlsSettings.certificates[0]"
                    ))
                })?;
            if !force && existing != new && !is_replaceable(existing) {
                return Ok(Applied::WouldReplace {
                    existing: existing.to_string(),
                });
            }
        }

        let cert = self.guarded_set(&cert_ptr, "certificateFile", cert_file, force)?;
        let key = self.guarded_set(&key_ptr, "keyFile", key_file, force)?;
        if cert == Applied::Unchanged && key == Applied::Unchanged {
            Ok(Applied::Unchanged)
        } else {
            Ok(Applied::Updated)
        }
    }

    /// Serialize with two-space indentation and a trailing newline,
    /// matching the shape the deployment ships with.
    pub fn to_pretty(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(&self.root)?;
        text.push('\n');
        Ok(text)
    }

    /// Persist to `path` (backup + temp + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let rendered = self.to_pretty()?;
        replace_file(path, &rendered)?;
        Ok(())
    }

    fn str_at(&self, pointer: &str) -> Option<&str> {
        self.root.pointer(pointer).and_then(Value::as_str)
    }

    fn guarded_set(
        &mut self,
        pointer: &str,
        field: &str,
        new: &str,
        force: bool,
    ) -> Result<Applied> {
        let slot = self
            .root
            .pointer_mut(pointer)
            .ok_or_else(|| TemplateError::MissingField(field.to_string()))?;
        let existing = slot.as_str().unwrap_or_default();

        if existing == new {
            return Ok(Applied::Unchanged);
        }
        if !force && !is_replaceable(existing) {
            return Ok(Applied::WouldReplace {
                existing: existing.to_string(),
            });
        }
        debug!("Setting {field}");
        *slot = Value::String(new.to_string());
        Ok(Applied::Updated)
    }
}

/// A field is safe to overwrite when it is empty or still holds a
/// placeholder token.
fn is_replaceable(existing: &str) -> bool {
    existing.is_empty() || !crate::find_tokens(existing).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID_A: &str = "11111111-1111-4111-8111-111111111111";
    const UUID_B: &str = "22222222-2222-4222-8222-222222222222";

    fn sample() -> ConfigDocument {
        ConfigDocument::parse(
            r#"{
              "inbounds": [{
                "port": 443,
                "protocol": "vless",
                "settings": { "clients": [{ "id": "<UPSTREAM-UUID>", "level": 0 }] },
                "streamSettings": {
                  "network": "ws",
                  "security": "tls",
                  "wsSettings": { "path": "/ws" },
                  "tlsSettings": {
                    "certificates": [{ "certificateFile": "<CERT-FILE>", "keyFile": "<KEY-FILE>" }]
                  }
                }
              }],
              "outbounds": [{
                "protocol": "vless",
                "settings": { "vnext": [{ "address": "<OUTBOUND-DOMAIN>", "port": 443 }] }
              }]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_reads_config_fields() {
        let doc = sample();
        assert_eq!(doc.client_id(0), Some("<UPSTREAM-UUID>"));
        assert_eq!(doc.outbound_address(0), Some("<OUTBOUND-DOMAIN>"));
        assert_eq!(doc.stream_network(0), Some("ws"));
        assert_eq!(doc.stream_security(0), Some("tls"));
        assert_eq!(doc.ws_path(0), Some("/ws"));
    }

    #[test]
    fn test_placeholder_is_replaced_without_force() {
        let mut doc = sample();
        let applied = doc.set_client_id(0, UUID_A, false).unwrap();
        assert_eq!(applied, Applied::Updated);
        assert_eq!(doc.client_id(0), Some(UUID_A));
    }

    #[test]
    fn test_resolved_value_is_guarded() {
        let mut doc = sample();
        doc.set_client_id(0, UUID_A, false).unwrap();

        // a different fresh identifier must not silently overwrite it
        let applied = doc.set_client_id(0, UUID_B, false).unwrap();
        assert_eq!(
            applied,
            Applied::WouldReplace {
                existing: UUID_A.to_string()
            }
        );
        assert_eq!(doc.client_id(0), Some(UUID_A));

        // explicit confirmation forces the write
        let applied = doc.set_client_id(0, UUID_B, true).unwrap();
        assert_eq!(applied, Applied::Updated);
        assert_eq!(doc.client_id(0), Some(UUID_B));
    }

    #[test]
    fn test_reapplying_same_value_is_unchanged() {
        let mut doc = sample();
        doc.set_client_id(0, UUID_A, false).unwrap();
        assert_eq!(doc.set_client_id(0, UUID_A, false).unwrap(), Applied::Unchanged);
    }

    #[test]
    fn test_outbound_address_update() {
        let mut doc = sample();
        let applied = doc.set_outbound_address(0, "us1.example.com", false).unwrap();
        assert_eq!(applied, Applied::Updated);
        assert_eq!(doc.outbound_address(0), Some("us1.example.com"));
    }

    #[test]
    fn test_tls_files_guarded_together() {
        let mut doc = sample();
        let applied = doc
            .set_tls_files(0, "/etc/tls/cert.pem", "/etc/tls/key.pem", false)
            .unwrap();
        assert_eq!(applied, Applied::Updated);

        // replacing resolved paths needs force; neither field changes
        let applied = doc
            .set_tls_files(0, "/new/cert.pem", "/new/key.pem", false)
            .unwrap();
        assert!(matches!(applied, Applied::WouldReplace { .. }));
        assert_eq!(
            doc.root()
                .pointer("/inbounds/0/streamSettings/tlsSettings/certificates/0/certificateFile")
                .and_then(Value::as_str),
            Some("/etc/tls/cert.pem")
        );
    }

    #[test]
    fn test_missing_field_error() {
        let mut doc = ConfigDocument::parse(r#"{ "inbounds": [] }"#).unwrap();
        assert!(matches!(
            doc.set_client_id(0, UUID_A, false),
            Err(TemplateError::MissingField(_))
        ));
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        assert!(matches!(
            ConfigDocument::parse("not json"),
            Err(TemplateError::Parse(_))
        ));
    }

    #[test]
    fn test_pretty_output_round_trips() {
        let mut doc = sample();
        doc.set_client_id(0, UUID_A, false).unwrap();
        let text = doc.to_pretty().unwrap();
        let reparsed = ConfigDocument::parse(&text).unwrap();
        assert_eq!(reparsed.client_id(0), Some(UUID_A));
        assert!(text.ends_with('\n'));
    }
}
