//! Subject Alternative Name construction.
//!
//! The final list always starts with the loopback identities, followed by the
//! discovered interface addresses and then the operator-supplied names.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use once_cell::sync::Lazy;
use rcgen::SanType;
use rcgen::string::Ia5String;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CertError, Result};

/// Dotted-quad IPv4 literal with every octet in 0..=255.
///
/// IPv6 literals deliberately do not match and end up as DNS entries.
static IPV4_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])\.){3}(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])$")
        .expect("IPv4 literal pattern is valid")
});

/// One SAN entry, kept as text until it is handed to the generator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum SubjectAltName {
    #[serde(rename = "dns")]
    Dns(String),
    #[serde(rename = "ip")]
    Ip(String),
}

impl SubjectAltName {
    pub fn value(&self) -> &str {
        match self {
            SubjectAltName::Dns(v) | SubjectAltName::Ip(v) => v,
        }
    }

    /// Convert into the rcgen representation.
    pub fn to_san_type(&self) -> Result<SanType> {
        match self {
            SubjectAltName::Dns(name) => Ia5String::try_from(name.as_str())
                .map(SanType::DnsName)
                .map_err(|e| CertError::GenerationFailure(format!("invalid DNS name '{name}': {e}"))),
            SubjectAltName::Ip(addr) => addr
                .parse::<IpAddr>()
                .map(SanType::IpAddress)
                .map_err(|e| CertError::GenerationFailure(format!("invalid IP address '{addr}': {e}"))),
        }
    }
}

impl fmt::Display for SubjectAltName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectAltName::Dns(v) => write!(f, "DNS:{v}"),
            SubjectAltName::Ip(v) => write!(f, "IP:{v}"),
        }
    }
}

/// Classify an operator-supplied name by pattern alone.
pub fn classify(name: &str) -> SubjectAltName {
    if IPV4_LITERAL.is_match(name) {
        SubjectAltName::Ip(name.to_string())
    } else {
        SubjectAltName::Dns(name.to_string())
    }
}

/// Build the ordered SAN list. Duplicates across sources are kept.
pub fn build_san_list<S: AsRef<str>>(alt_names: &[S], discovered: &[Ipv4Addr]) -> Vec<SubjectAltName> {
    let mut sans = vec![
        SubjectAltName::Dns("localhost".to_string()),
        SubjectAltName::Ip("127.0.0.1".to_string()),
        SubjectAltName::Ip("::1".to_string()),
    ];
    sans.extend(discovered.iter().map(|ip| SubjectAltName::Ip(ip.to_string())));

    let (ips, dns): (Vec<_>, Vec<_>) = alt_names
        .iter()
        .map(|n| classify(n.as_ref()))
        .partition(|san| matches!(san, SubjectAltName::Ip(_)));
    sans.extend(ips);
    sans.extend(dns);
    sans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_ipv4_literal_as_ip() {
        assert_eq!(classify("203.0.113.5"), SubjectAltName::Ip("203.0.113.5".into()));
    }

    #[test]
    fn classifies_hostname_as_dns() {
        assert_eq!(classify("game.example.com"), SubjectAltName::Dns("game.example.com".into()));
    }

    #[test]
    fn ipv6_literal_falls_through_to_dns() {
        assert_eq!(classify("2001:db8::1"), SubjectAltName::Dns("2001:db8::1".into()));
    }

    #[test]
    fn malformed_quads_are_dns() {
        for name in ["999.1.1.1", "1.2.3", "1.2.3.4.5", "01.2.3.4", " 1.2.3.4"] {
            assert!(matches!(classify(name), SubjectAltName::Dns(_)), "{name}");
        }
    }

    #[test]
    fn list_order_is_defaults_discovered_ips_then_dns() {
        let sans = build_san_list(
            &["play.example.net", "198.51.100.20", "panel"],
            &[Ipv4Addr::new(192, 168, 1, 10)],
        );
        let rendered: Vec<String> = sans.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            [
                "DNS:localhost",
                "IP:127.0.0.1",
                "IP:::1",
                "IP:192.168.1.10",
                "IP:198.51.100.20",
                "DNS:play.example.net",
                "DNS:panel",
            ]
        );
    }

    #[test]
    fn duplicates_are_preserved() {
        let sans = build_san_list(&["localhost", "127.0.0.1"], &[]);
        assert_eq!(sans.len(), 5);
        assert_eq!(sans.iter().filter(|s| s.value() == "localhost").count(), 2);
    }

    #[test]
    fn converts_to_rcgen_types() {
        assert!(matches!(
            SubjectAltName::Ip("::1".into()).to_san_type(),
            Ok(SanType::IpAddress(_))
        ));
        assert!(matches!(
            SubjectAltName::Dns("localhost".into()).to_san_type(),
            Ok(SanType::DnsName(_))
        ));
        assert!(matches!(
            SubjectAltName::Dns("jeu-ü.example".into()).to_san_type(),
            Err(CertError::GenerationFailure(_))
        ));
    }
}
