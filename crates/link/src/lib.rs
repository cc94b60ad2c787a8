//! RelayKit Connection Links
//!
//! Encodes a resolved connection-parameter record into a single
//! shareable string and decodes such strings back into the canonical
//! record. Two wire shapes are supported; the caller always picks one
//! explicitly, there is no preferred default:
//!
//! - [`LinkEncoding::Payload`] — the whole record as a compact JSON
//!   document, URL-safe base64 without padding
//! - [`LinkEncoding::Query`] — `vless://<id>@<addr>:<port>?...` with
//!   the record spread over the authority, query string, and fragment
//!
//! Both satisfy `decode(encode(r)) == r` and, for links produced here,
//! `encode(decode(link)) == link`.

mod payload;
mod record;
mod uri;

pub use record::ConnectionLink;

use thiserror::Error;

/// Link scheme shared by both encodings.
pub const SCHEME: &str = "vless://";

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Unsupported link scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Invalid base64 payload: {0}")]
    InvalidPayload(#[from] base64::DecodeError),

    #[error("Malformed link payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("Link payload is not valid UTF-8")]
    NotUtf8,

    #[error("Missing identifier in link")]
    MissingIdentifier,

    #[error("Malformed authority section: {0}")]
    MalformedAuthority(String),

    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Missing query field: {0}")]
    MissingQueryField(&'static str),
}

pub type Result<T> = std::result::Result<T, LinkError>;

/// Which wire shape to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEncoding {
    /// Base64 compact-JSON payload
    Payload,
    /// Authority + query-string URI
    Query,
}

impl LinkEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payload => "payload",
            Self::Query => "query",
        }
    }
}

/// Encode `link` with the chosen encoding.
pub fn encode(link: &ConnectionLink, encoding: LinkEncoding) -> Result<String> {
    match encoding {
        LinkEncoding::Payload => payload::encode(link),
        LinkEncoding::Query => uri::encode(link),
    }
}

/// Decode a link of either encoding, detected by scheme and structure.
///
/// The query form always carries `id@address:port`; the payload form is
/// bare base64, which cannot contain `@`.
pub fn decode(link: &str) -> Result<ConnectionLink> {
    let rest = link.strip_prefix(SCHEME).ok_or_else(|| {
        let scheme = link.split("://").next().unwrap_or_default();
        LinkError::UnsupportedScheme(scheme.to_string())
    })?;
    if rest.contains('@') {
        uri::decode(rest)
    } else {
        payload::decode(rest)
    }
}
