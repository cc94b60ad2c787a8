//! Authority + query-string encoding
//!
//! `vless://<id>@<address>:<port>?encryption=none&type=..&security=..`
//! with optional fields omitted entirely when absent (never included
//! with an empty value) and the display name carried as the fragment.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::record::{ConnectionLink, DEFAULT_AUX_ID, DEFAULT_HEADER_TYPE, DEFAULT_VERSION};
use crate::{LinkError, Result, SCHEME};

/// Everything outside the RFC 3986 unreserved set gets escaped.
const ESCAPED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn enc(value: &str) -> String {
    utf8_percent_encode(value, ESCAPED).to_string()
}

fn dec(value: &str) -> Result<String> {
    percent_decode_str(value)
        .decode_utf8()
        .map(|v| v.into_owned())
        .map_err(|_| LinkError::NotUtf8)
}

pub(crate) fn encode(link: &ConnectionLink) -> Result<String> {
    let mut query: Vec<(&str, String)> = vec![
        ("encryption", "none".to_string()),
        ("type", enc(&link.network)),
        ("security", enc(&link.security)),
    ];
    if link.header_type != DEFAULT_HEADER_TYPE {
        query.push(("headerType", enc(&link.header_type)));
    }
    if !link.host.is_empty() {
        query.push(("host", enc(&link.host)));
    }
    if !link.path.is_empty() {
        query.push(("path", enc(&link.path)));
    }
    if link.aux_id != DEFAULT_AUX_ID {
        query.push(("aid", enc(&link.aux_id)));
    }
    if link.version != DEFAULT_VERSION {
        query.push(("v", enc(&link.version)));
    }

    let query = query
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    // an IPv6 address carries colons, so it goes in brackets; anything
    // else is percent-encoded like the other fields
    let address = if link.address.contains(':') {
        format!("[{}]", link.address)
    } else {
        enc(&link.address)
    };
    let mut uri = format!(
        "{SCHEME}{}@{address}:{}?{query}",
        enc(&link.id),
        link.port
    );
    if !link.name.is_empty() {
        uri.push('#');
        uri.push_str(&enc(&link.name));
    }
    Ok(uri)
}

/// Decode the portion after the scheme prefix.
pub(crate) fn decode(rest: &str) -> Result<ConnectionLink> {
    let (rest, fragment) = match rest.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (rest, None),
    };
    let (authority, query) = match rest.split_once('?') {
        Some((authority, query)) => (authority, Some(query)),
        None => (rest, None),
    };

    let (id, host_port) = authority
        .split_once('@')
        .ok_or(LinkError::MissingIdentifier)?;
    if id.is_empty() {
        return Err(LinkError::MissingIdentifier);
    }
    let id = dec(id)?;

    let (address, port) = if let Some(bracketed) = host_port.strip_prefix('[') {
        let (address, port) = bracketed
            .split_once("]:")
            .ok_or_else(|| LinkError::MalformedAuthority(host_port.to_string()))?;
        (address.to_string(), port)
    } else {
        let (address, port) = host_port
            .rsplit_once(':')
            .ok_or_else(|| LinkError::MalformedAuthority(host_port.to_string()))?;
        (dec(address)?, port)
    };
    if address.is_empty() {
        return Err(LinkError::MalformedAuthority(host_port.to_string()));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| LinkError::InvalidPort(port.to_string()))?;

    let mut link = ConnectionLink::new(address, port, id);
    link.network = String::new();
    link.security = String::new();

    let mut saw_type = false;
    let mut saw_security = false;
    for pair in query.unwrap_or_default().split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = dec(value)?;
        match key {
            // fixed by the protocol; accepted but not stored
            "encryption" => {}
            "type" => {
                link.network = value;
                saw_type = true;
            }
            "security" => {
                link.security = value;
                saw_security = true;
            }
            "headerType" => link.header_type = value,
            "host" => link.host = value,
            "path" => link.path = value,
            "aid" => link.aux_id = value,
            "v" => link.version = value,
            // unknown parameters are ignored
            _ => {}
        }
    }
    if !saw_type {
        return Err(LinkError::MissingQueryField("type"));
    }
    if !saw_security {
        return Err(LinkError::MissingQueryField("security"));
    }

    if let Some(fragment) = fragment {
        link.name = dec(fragment)?;
    }
    Ok(link)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: &str = "11111111-1111-4111-8111-111111111111";

    fn sample() -> ConnectionLink {
        let mut link = ConnectionLink::new("node.example.com", 443, UUID);
        link.name = "us node".to_string();
        link.network = "ws".to_string();
        link.host = "node.example.com".to_string();
        link.path = "/ws".to_string();
        link.security = "tls".to_string();
        link
    }

    #[test]
    fn test_round_trip() {
        let record = sample();
        let link = encode(&record).unwrap();
        assert_eq!(crate::decode(&link).unwrap(), record);
    }

    #[test]
    fn test_shape_and_escaping() {
        let link = encode(&sample()).unwrap();
        assert_eq!(
            link,
            format!(
                "vless://{UUID}@node.example.com:443\
                 ?encryption=none&type=ws&security=tls\
                 &host=node.example.com&path=%2Fws#us%20node"
            )
        );
    }

    #[test]
    fn test_optional_fields_omitted_not_empty() {
        let mut record = sample();
        record.name.clear();
        record.host.clear();
        record.path.clear();
        let link = encode(&record).unwrap();
        assert!(!link.contains("host="));
        assert!(!link.contains("path="));
        assert!(!link.contains('#'));
        assert_eq!(crate::decode(&link).unwrap(), record);
    }

    #[test]
    fn test_non_default_aux_and_version_round_trip() {
        let mut record = sample();
        record.aux_id = "5".to_string();
        record.version = "1".to_string();
        record.header_type = "http".to_string();
        let link = encode(&record).unwrap();
        assert!(link.contains("aid=5"));
        assert!(link.contains("v=1"));
        assert!(link.contains("headerType=http"));
        assert_eq!(crate::decode(&link).unwrap(), record);
    }

    #[test]
    fn test_ipv6_address_is_bracketed() {
        let mut record = sample();
        record.address = "2001:db8::1".to_string();
        record.host.clear();
        let link = encode(&record).unwrap();
        assert!(link.contains("@[2001:db8::1]:443?"), "{link}");
        assert_eq!(crate::decode(&link).unwrap(), record);
    }

    #[test]
    fn test_address_is_escaped_like_other_fields() {
        let mut record = sample();
        record.address = "node example.com".to_string();
        record.host.clear();
        let link = encode(&record).unwrap();
        assert!(link.contains("@node%20example.com:443?"), "{link}");
        assert_eq!(crate::decode(&link).unwrap(), record);
    }

    #[test]
    fn test_unterminated_bracket_is_malformed() {
        assert!(matches!(
            decode("id@[2001:db8::1:443?encryption=none&type=ws&security=tls"),
            Err(LinkError::MalformedAuthority(_))
        ));
    }

    #[test]
    fn test_missing_identifier() {
        assert!(matches!(
            decode("@node.example.com:443?encryption=none&type=ws&security=tls"),
            Err(LinkError::MissingIdentifier)
        ));
    }

    #[test]
    fn test_malformed_authority() {
        assert!(matches!(
            decode("id@nodeexamplecom?encryption=none&type=ws&security=tls"),
            Err(LinkError::MalformedAuthority(_))
        ));
        assert!(matches!(
            decode("id@:443?encryption=none&type=ws&security=tls"),
            Err(LinkError::MalformedAuthority(_))
        ));
    }

    #[test]
    fn test_invalid_port() {
        assert!(matches!(
            decode("id@node.example.com:https?encryption=none&type=ws&security=tls"),
            Err(LinkError::InvalidPort(_))
        ));
    }

    #[test]
    fn test_missing_required_query_fields() {
        assert!(matches!(
            decode("id@node.example.com:443?security=tls"),
            Err(LinkError::MissingQueryField("type"))
        ));
        assert!(matches!(
            decode("id@node.example.com:443?type=ws"),
            Err(LinkError::MissingQueryField("security"))
        ));
    }
}
