use std::collections::BTreeSet;

use async_trait::async_trait;

use scopr_common::error::{FailureKind, ProviderError};
use scopr_common::ports::{DiscoveryProvider, TargetKind};

use crate::http::{self, HttpClient};

const REVERSE_IP_URL: &str = "https://api.hackertarget.com/reverseiplookup/";

/// Names hosted on one address, from HackerTarget's reverse IP lookup.
pub struct ReverseIp {
    http: HttpClient,
}

impl ReverseIp {
    pub const NAME: &'static str = "reverse_ip";

    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl DiscoveryProvider for ReverseIp {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn accepts(&self, target: TargetKind) -> bool {
        target == TargetKind::Ip
    }

    async fn discover(&self, target: &str) -> Result<BTreeSet<String>, ProviderError> {
        let url = http::endpoint(REVERSE_IP_URL, &[("q", target)])
            .map_err(|kind| ProviderError::new(Self::NAME, target, kind))?;
        let body: String = self
            .http
            .get_text(url)
            .await
            .map_err(|kind| ProviderError::new(Self::NAME, target, kind))?;

        parse_reverse_ip(&body).map_err(|kind| ProviderError::new(Self::NAME, target, kind))
    }
}

/// The API answers in plain text and reports errors in-band.
fn parse_reverse_ip(body: &str) -> Result<BTreeSet<String>, FailureKind> {
    let trimmed: &str = body.trim();
    if trimmed.starts_with("No DNS A records found") {
        return Ok(BTreeSet::new());
    }
    if trimmed.starts_with("error") || trimmed.starts_with("API count exceeded") {
        return Err(FailureKind::Malformed(trimmed.lines().next().unwrap_or_default().to_string()));
    }

    Ok(trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_become_candidates() {
        let names = parse_reverse_ip("www.example.com\nexample.org\n\n").unwrap();
        assert_eq!(names.len(), 2);
        assert!(names.contains("example.org"));
    }

    #[test]
    fn in_band_errors() {
        assert!(parse_reverse_ip("No DNS A records found for 10.0.0.5").unwrap().is_empty());
        assert!(matches!(
            parse_reverse_ip("API count exceeded - Increase Quota with Membership"),
            Err(FailureKind::Malformed(_))
        ));
        assert!(parse_reverse_ip("error check your search parameter").is_err());
    }
}
