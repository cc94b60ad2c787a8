//! Connection-link codec behavior across both wire encodings, including
//! links produced by older external generators.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;

use relaykit_link::{decode, encode, ConnectionLink, LinkEncoding, LinkError, SCHEME};
use relaykit_template::ConfigDocument;

const UUID: &str = "11111111-1111-4111-8111-111111111111";

fn ws_tls_record() -> ConnectionLink {
    let mut link = ConnectionLink::new("node.example.com", 443, UUID);
    link.name = "node.example.com".to_string();
    link.network = "ws".to_string();
    link.security = "tls".to_string();
    link.host = "node.example.com".to_string();
    link.path = "/ws".to_string();
    link
}

#[test]
fn both_encodings_round_trip_the_record() {
    let record = ws_tls_record();
    for encoding in [LinkEncoding::Payload, LinkEncoding::Query] {
        let link = encode(&record, encoding).unwrap();
        assert!(link.starts_with(SCHEME), "{link}");
        let decoded = decode(&link).unwrap();
        assert_eq!(decoded, record, "{}", encoding.as_str());
        // and the re-encoded link is byte-identical
        assert_eq!(encode(&decoded, encoding).unwrap(), link);
    }
}

#[test]
fn payload_encoding_is_compact_json_in_canonical_key_order() {
    let link = encode(&ws_tls_record(), LinkEncoding::Payload).unwrap();
    let body = link.strip_prefix(SCHEME).unwrap();
    // URL-safe alphabet, no padding
    assert!(!body.contains('='));
    assert!(!body.contains('+'));
    assert!(!body.contains('/'));

    let json = String::from_utf8(URL_SAFE_NO_PAD.decode(body).unwrap()).unwrap();
    assert!(json.starts_with(r#"{"v":"#), "{json}");
    assert!(json.ends_with(r#""tls":"tls"}"#), "{json}");
    assert!(json.contains(r#""port":"443""#), "{json}");
    assert!(!json.contains(' '), "payload must be compact: {json}");
}

#[test]
fn query_encoding_has_the_documented_shape() {
    let link = encode(&ws_tls_record(), LinkEncoding::Query).unwrap();
    assert_eq!(
        link,
        format!(
            "vless://{UUID}@node.example.com:443\
             ?encryption=none&type=ws&security=tls\
             &host=node.example.com&path=%2Fws#node.example.com"
        )
    );
}

#[test]
fn query_encoding_omits_default_valued_params() {
    let mut record = ConnectionLink::new("node.example.com", 8443, UUID);
    record.name = "plain".to_string();
    // tcp transport, no security, all defaults elsewhere
    let link = encode(&record, LinkEncoding::Query).unwrap();
    assert!(!link.contains("headerType="));
    assert!(!link.contains("host="));
    assert!(!link.contains("path="));
    assert!(!link.contains("aid="));
    assert_eq!(decode(&link).unwrap(), record);
}

#[test]
fn query_fragment_preserves_spaces_in_names() {
    let mut record = ws_tls_record();
    record.name = "us node 1".to_string();
    let link = encode(&record, LinkEncoding::Query).unwrap();
    assert!(link.ends_with("#us%20node%201"));
    assert_eq!(decode(&link).unwrap().name, "us node 1");
}

/// Older generators emit standard base64 with `=` padding and never
/// wrote the `aid` key; those links must still decode to the same
/// record, with the auxiliary id defaulted.
#[test]
fn legacy_padded_standard_base64_payload_decodes() {
    let record = ws_tls_record();
    let json = serde_json::json!({
        "v": record.version, "ps": record.name, "add": record.address,
        "port": record.port.to_string(), "id": record.id,
        "net": record.network, "type": record.header_type,
        "host": record.host, "path": record.path, "tls": record.security,
    });
    let legacy = format!("{SCHEME}{}", STANDARD.encode(json.to_string()));
    let decoded = decode(&legacy).unwrap();
    assert_eq!(decoded.aux_id, "0");
    assert_eq!(decoded, record);
}

#[test]
fn malformed_links_are_clean_errors() {
    assert!(matches!(
        decode("trojan://abc"),
        Err(LinkError::UnsupportedScheme(_))
    ));
    assert!(matches!(
        decode("vless://!!!not-base64!!!"),
        Err(LinkError::InvalidPayload(_))
    ));
    assert!(matches!(
        decode("vless://@host:443?type=tcp&security=none"),
        Err(LinkError::MissingIdentifier)
    ));
    assert!(matches!(
        decode(&format!("vless://{UUID}@host:notaport?type=tcp&security=none")),
        Err(LinkError::InvalidPort(_))
    ));
    assert!(matches!(
        decode(&format!("vless://{UUID}@host:443?security=none")),
        Err(LinkError::MissingQueryField("type"))
    ));
}

/// A link is always derived from the persisted configuration: take the
/// identifier and transport details from the document, never from the
/// operator's memory.
#[test]
fn link_is_derived_from_persisted_config() {
    let doc = ConfigDocument::parse(&format!(
        r#"{{
          "inbounds": [{{
            "port": 443,
            "protocol": "vless",
            "settings": {{ "clients": [{{ "id": "{UUID}" }}] }},
            "streamSettings": {{
              "network": "ws",
              "security": "tls",
              "wsSettings": {{ "path": "/ws" }}
            }}
          }}]
        }}"#
    ))
    .unwrap();

    let mut link = ConnectionLink::new(
        "node.example.com",
        443,
        doc.client_id(0).unwrap().to_string(),
    );
    link.name = "node.example.com".to_string();
    link.network = doc.stream_network(0).unwrap().to_string();
    link.security = doc.stream_security(0).unwrap().to_string();
    link.path = doc.ws_path(0).unwrap().to_string();
    link.host = link.address.clone();

    assert_eq!(link, ws_tls_record());
    for encoding in [LinkEncoding::Payload, LinkEncoding::Query] {
        let encoded = encode(&link, encoding).unwrap();
        assert_eq!(decode(&encoded).unwrap().id, UUID);
    }
}
