//! Canonicalization of single field values before they reach a matcher.

use crate::record::{ContractAddress, Field, Normalization};

/// Canonicalizes `raw` according to the rules for `field_name`.
///
/// `field_name` may be a JSON key (`"UI/Website Link"`) or a snake_case name
/// (`"ui_link"`). Unknown names return the value unchanged.
pub fn normalize(field_name: &str, raw: &str) -> String {
    match Field::from_key(field_name) {
        Some(field) => normalize_field(field, raw),
        None => raw.to_string(),
    }
}

pub fn normalize_field(field: Field, raw: &str) -> String {
    match field.normalization() {
        Normalization::Identifier => normalize_identifier(raw),
        Normalization::Link => normalize_link(raw),
        Normalization::Text => normalize_text(raw),
    }
}

/// Trims surrounding whitespace. Well-formed CAIP-10 values additionally get
/// their namespace and chain id lower-cased; the address segment keeps its case.
pub fn normalize_identifier(raw: &str) -> String {
    match ContractAddress::parse(raw) {
        Ok(address) => address.canonical(),
        Err(_) => raw.trim().to_string(),
    }
}

/// Lower-cases scheme and host, drops a `www.` prefix and default ports, and
/// strips trailing slashes. Paths and queries keep their case.
pub fn normalize_link(raw: &str) -> String {
    let trimmed = raw.trim();
    let (scheme, rest) = match trimmed.find("://") {
        Some(pos) => (Some(trimmed[..pos].to_ascii_lowercase()), &trimmed[pos + 3..]),
        None => (None, trimmed),
    };

    let authority_end = rest
        .find(|c: char| matches!(c, '/' | '?' | '#'))
        .unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);

    let mut host = authority.to_ascii_lowercase();
    if let Some(stripped) = host.strip_prefix("www.") {
        host = stripped.to_string();
    }
    for (port, default_scheme) in [(":80", "http"), (":443", "https")] {
        let applies = scheme.as_deref().map_or(true, |s| s == default_scheme);
        if applies && host.ends_with(port) {
            host.truncate(host.len() - port.len());
        }
    }

    let mut normalized = String::with_capacity(trimmed.len());
    if let Some(scheme) = scheme {
        normalized.push_str(&scheme);
        normalized.push_str("://");
    }
    normalized.push_str(&host);
    normalized.push_str(tail);
    normalized.trim_end_matches('/').to_string()
}

/// Lower-cases, strips leading and trailing punctuation, and collapses
/// internal whitespace runs to a single space.
pub fn normalize_text(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    lowered
        .trim_matches(|c: char| !c.is_alphanumeric())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_drop_presentation_noise() {
        assert_eq!(normalize_link("HTTPS://WWW.Uniswap.org/"), "https://uniswap.org");
        assert_eq!(
            normalize_link("http://app.aave.com:80/Markets/"),
            "http://app.aave.com/Markets"
        );
        assert_eq!(normalize_link("https://lido.fi:443"), "https://lido.fi");
        assert_eq!(normalize_link("https://lido.fi:8443/"), "https://lido.fi:8443");
        assert_eq!(normalize_link(" www.Curve.fi "), "curve.fi");
        assert_eq!(normalize_link(""), "");
    }

    #[test]
    fn http_default_port_is_kept_for_https() {
        assert_eq!(normalize_link("https://example.com:80"), "https://example.com:80");
    }

    #[test]
    fn identifiers_keep_address_case() {
        assert_eq!(normalize_identifier(" EIP155:1:0xAbC\n"), "eip155:1:0xAbC");
        assert_eq!(normalize_identifier(" not-an-address "), "not-an-address");
    }

    #[test]
    fn text_is_folded_and_trimmed() {
        assert_eq!(normalize_text("  \"Uniswap   V3:\"  "), "uniswap v3");
        assert_eq!(normalize_text("USDC-WETH Pool."), "usdc-weth pool");
        assert_eq!(normalize_text("..."), "");
    }

    #[test]
    fn dispatches_by_field_name() {
        assert_eq!(normalize("Project Name", " Aave "), "aave");
        assert_eq!(normalize("ui_link", "https://aave.com/"), "https://aave.com");
        assert_eq!(normalize("Deployer", " Keep Me "), " Keep Me ");
    }
}
