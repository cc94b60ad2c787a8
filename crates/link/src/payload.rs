//! Compact base64 payload encoding
//!
//! The whole record is serialized as a compact JSON document with a
//! fixed key order, then base64-encoded with the URL-safe alphabet and
//! no padding. Decoding tolerates trailing `=` padding (one historical
//! producer emitted it) but encoding never does.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::record::{ConnectionLink, DEFAULT_AUX_ID};
use crate::{LinkError, Result, SCHEME};

fn default_aux_id() -> String {
    DEFAULT_AUX_ID.to_string()
}

/// Wire shape of the payload document. Struct field order is the
/// canonical key order of the emitted JSON. The historical producer
/// never wrote `aid`, so it defaults on decode.
#[derive(Serialize, Deserialize)]
struct Payload {
    v: String,
    ps: String,
    add: String,
    port: String,
    id: String,
    #[serde(default = "default_aux_id")]
    aid: String,
    net: String,
    #[serde(rename = "type")]
    header_type: String,
    host: String,
    path: String,
    tls: String,
}

pub(crate) fn encode(link: &ConnectionLink) -> Result<String> {
    let payload = Payload {
        v: link.version.clone(),
        ps: link.name.clone(),
        add: link.address.clone(),
        port: link.port.to_string(),
        id: link.id.clone(),
        aid: link.aux_id.clone(),
        net: link.network.clone(),
        header_type: link.header_type.clone(),
        host: link.host.clone(),
        path: link.path.clone(),
        tls: link.security.clone(),
    };
    let json = serde_json::to_string(&payload)?;
    Ok(format!("{SCHEME}{}", URL_SAFE_NO_PAD.encode(json)))
}

pub(crate) fn decode(payload: &str) -> Result<ConnectionLink> {
    let trimmed = payload.trim_end_matches('=');
    let bytes = match URL_SAFE_NO_PAD.decode(trimmed) {
        Ok(bytes) => bytes,
        // older links used the standard alphabet
        Err(_) if trimmed.contains('+') || trimmed.contains('/') => {
            STANDARD_NO_PAD.decode(trimmed)?
        }
        Err(e) => return Err(e.into()),
    };
    let json = String::from_utf8(bytes).map_err(|_| LinkError::NotUtf8)?;
    let payload: Payload = serde_json::from_str(&json)?;
    let port = payload
        .port
        .parse::<u16>()
        .map_err(|_| LinkError::InvalidPort(payload.port.clone()))?;

    Ok(ConnectionLink {
        version: payload.v,
        name: payload.ps,
        address: payload.add,
        port,
        id: payload.id,
        aux_id: payload.aid,
        network: payload.net,
        header_type: payload.header_type,
        host: payload.host,
        path: payload.path,
        security: payload.tls,
    })
}
