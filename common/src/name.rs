//! # Name Classification
//!
//! Discovery providers hand back loosely formatted strings. This module decides,
//! once and for all, what each string is:
//!
//! * an IP address,
//! * a root [`Classified::Domain`],
//! * a [`Classified::Subdomain`] together with its apex,
//! * a webpage URL,
//! * or nothing usable.
//!
//! Apexes already in scope take precedence over the registrable-domain
//! heuristic, so `api.corp.example.co.uk` is a subdomain of `corp.example.co.uk`
//! when that name has been registered as a scope domain.

use std::collections::BTreeSet;
use std::net::IpAddr;

use url::Url;

const MAX_NAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Second-level public suffixes under which registrations happen one label deeper.
const MULTI_LABEL_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "ltd.uk", "plc.uk", "me.uk",
    "com.au", "net.au", "org.au", "edu.au", "gov.au",
    "co.nz", "org.nz", "govt.nz",
    "co.jp", "ne.jp", "or.jp", "ac.jp",
    "com.br", "net.br", "org.br", "gov.br",
    "com.ar", "com.mx", "com.co", "com.pe",
    "co.za", "org.za",
    "co.in", "net.in", "org.in",
    "com.cn", "net.cn", "org.cn",
    "com.tr", "com.sg", "com.hk", "com.tw", "co.kr", "co.il",
    "gob.es", "com.es", "org.es",
];

/// The tagged outcome of classifying one raw string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    Ip(IpAddr),
    Domain(String),
    Subdomain { name: String, apex: String },
    Url { url: String, host: String },
    Invalid { raw: String, reason: &'static str },
}

impl Classified {
    pub fn label(&self) -> &'static str {
        match self {
            Classified::Ip(_) => "ip",
            Classified::Domain(_) => "domain",
            Classified::Subdomain { .. } => "subdomain",
            Classified::Url { .. } => "url",
            Classified::Invalid { .. } => "invalid",
        }
    }
}

/// Classifies `raw` relative to the apex domains currently in scope.
pub fn classify(raw: &str, known_apexes: &BTreeSet<String>) -> Classified {
    let trimmed: &str = raw.trim();
    if trimmed.is_empty() {
        return invalid(raw, "empty");
    }

    if let Ok(ip) = trimmed.parse::<IpAddr>() {
        return Classified::Ip(ip);
    }

    if trimmed.contains("://") {
        return classify_url(raw, trimmed);
    }

    let name: String = normalize(trimmed);
    if let Err(reason) = validate_hostname(&name) {
        return invalid(raw, reason);
    }

    if let Some(apex) = matching_apex(&name, known_apexes) {
        return if apex == name {
            Classified::Domain(name)
        } else {
            Classified::Subdomain { name, apex }
        };
    }

    match registrable_domain(&name) {
        Some(apex) if apex == name => Classified::Domain(name),
        Some(apex) => Classified::Subdomain { name, apex },
        None => invalid(raw, "bare public suffix"),
    }
}

/// Lowercases and strips a trailing dot and a leading wildcard label.
pub fn normalize(name: &str) -> String {
    let lowered: String = name.trim().to_ascii_lowercase();
    let without_dot: &str = lowered.strip_suffix('.').unwrap_or(&lowered);
    let without_wildcard: &str = without_dot.strip_prefix("*.").unwrap_or(without_dot);
    without_wildcard.to_string()
}

/// Returns the registrable root of `name`, or `None` when `name` is itself a
/// public suffix.
pub fn registrable_domain(name: &str) -> Option<String> {
    let labels: Vec<&str> = name.split('.').collect();
    if labels.len() < 2 {
        return None;
    }

    let last_two: String = labels[labels.len() - 2..].join(".");
    let wanted: usize = if MULTI_LABEL_SUFFIXES.contains(&last_two.as_str()) { 3 } else { 2 };

    if labels.len() < wanted {
        return None;
    }
    Some(labels[labels.len() - wanted..].join("."))
}

fn classify_url(raw: &str, trimmed: &str) -> Classified {
    let Ok(url) = Url::parse(trimmed) else {
        return invalid(raw, "unparseable url");
    };
    if !matches!(url.scheme(), "http" | "https") {
        return invalid(raw, "unsupported url scheme");
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Classified::Url {
            url: url.to_string(),
            host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
        },
        _ => invalid(raw, "url without host"),
    }
}

fn matching_apex(name: &str, known_apexes: &BTreeSet<String>) -> Option<String> {
    known_apexes
        .iter()
        .filter(|apex| name == apex.as_str() || name.ends_with(&format!(".{apex}")))
        .max_by_key(|apex| apex.len())
        .cloned()
}

fn validate_hostname(name: &str) -> Result<(), &'static str> {
    if name.len() > MAX_NAME_LEN {
        return Err("name too long");
    }

    let labels: Vec<&str> = name.split('.').collect();
    if labels.len() < 2 {
        return Err("single label");
    }

    for label in &labels {
        if label.is_empty() {
            return Err("empty label");
        }
        if label.len() > MAX_LABEL_LEN {
            return Err("label too long");
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err("label starts or ends with hyphen");
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err("invalid character");
        }
    }

    let tld: &str = labels[labels.len() - 1];
    let is_alpha_tld: bool = tld.chars().all(|c| c.is_ascii_alphabetic());
    let is_idn_tld: bool = tld.starts_with("xn--");
    if !(is_alpha_tld || is_idn_tld) {
        return Err("invalid top level domain");
    }
    Ok(())
}

fn invalid(raw: &str, reason: &'static str) -> Classified {
    Classified::Invalid {
        raw: raw.to_string(),
        reason,
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    fn apexes(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn ip_addresses() {
        let known = apexes(&[]);
        assert_eq!(
            classify("10.0.0.5", &known),
            Classified::Ip("10.0.0.5".parse().unwrap())
        );
        assert!(matches!(classify(" ::1 ", &known), Classified::Ip(_)));
    }

    #[test]
    fn known_apex_takes_precedence() {
        let known = apexes(&["example.com", "corp.example.co.uk"]);

        assert_eq!(classify("Example.COM.", &known), Classified::Domain("example.com".into()));
        assert_eq!(
            classify("api.example.com", &known),
            Classified::Subdomain { name: "api.example.com".into(), apex: "example.com".into() }
        );
        assert_eq!(
            classify("vpn.corp.example.co.uk", &known),
            Classified::Subdomain {
                name: "vpn.corp.example.co.uk".into(),
                apex: "corp.example.co.uk".into()
            }
        );
    }

    #[test]
    fn unknown_names_use_registrable_domain() {
        let known = apexes(&["example.com"]);

        assert_eq!(classify("example.org", &known), Classified::Domain("example.org".into()));
        assert_eq!(
            classify("*.shop.example.org", &known),
            Classified::Subdomain { name: "shop.example.org".into(), apex: "example.org".into() }
        );
        assert_eq!(classify("example.co.uk", &known), Classified::Domain("example.co.uk".into()));
        assert_eq!(
            classify("www.example.co.uk", &known),
            Classified::Subdomain { name: "www.example.co.uk".into(), apex: "example.co.uk".into() }
        );
    }

    #[test]
    fn urls() {
        let known = apexes(&["example.com"]);
        assert_eq!(
            classify("https://www.example.com/login?next=/", &known),
            Classified::Url {
                url: "https://www.example.com/login?next=/".into(),
                host: "www.example.com".into()
            }
        );
        assert!(matches!(classify("ftp://example.com", &known), Classified::Invalid { .. }));
    }

    #[test]
    fn garbage_is_invalid() {
        let known = apexes(&["example.com"]);
        for raw in [
            "", "   ", "localhost", "exa mple.com", "-bad.example.com", "a..b.com", "co.uk", "1.2.3.4.5", "name.123",
            "_dmarc.example.com",
        ] {
            assert!(
                matches!(classify(raw, &known), Classified::Invalid { .. }),
                "expected {raw:?} to be invalid"
            );
        }
    }

    #[test]
    fn every_input_maps_to_exactly_one_class() {
        let known = apexes(&["example.com"]);
        let inputs = [
            "10.1.1.1", "example.com", "a.example.com", "http://a.example.com/x", "???",
            "example.net", "b.example.net",
        ];
        let labels: Vec<&str> = inputs.iter().map(|i| classify(i, &known).label()).collect();
        assert_eq!(
            labels,
            vec!["ip", "domain", "subdomain", "url", "invalid", "domain", "subdomain"]
        );
    }
}
