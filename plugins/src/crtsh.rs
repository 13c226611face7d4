//! Certificate transparency lookups through crt.sh.
//!
//! Certificates issued for the target often list unrelated root domains in
//! their SANs. Those are returned as-is; deciding what they are is the
//! classifier's job.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Deserialize;

use scopr_common::error::ProviderError;
use scopr_common::ports::{DiscoveryProvider, TargetKind};

use crate::http::{self, HttpClient};

const CRTSH_URL: &str = "https://crt.sh/";

#[derive(Debug, Deserialize)]
struct CertEntry {
    #[serde(default)]
    common_name: Option<String>,
    #[serde(default)]
    name_value: Option<String>,
}

pub struct SimilarCertificate {
    http: HttpClient,
}

impl SimilarCertificate {
    pub const NAME: &'static str = "similar_certificate";

    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl DiscoveryProvider for SimilarCertificate {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn accepts(&self, target: TargetKind) -> bool {
        target == TargetKind::Domain
    }

    async fn discover(&self, target: &str) -> Result<BTreeSet<String>, ProviderError> {
        let wildcard: String = format!("%.{target}");
        let url = http::endpoint(CRTSH_URL, &[("q", &wildcard), ("output", "json")])
            .map_err(|kind| ProviderError::new(Self::NAME, target, kind))?;

        let entries: Vec<CertEntry> = self
            .http
            .get_json(url)
            .await
            .map_err(|kind| ProviderError::new(Self::NAME, target, kind))?;

        Ok(names_from_entries(entries))
    }
}

fn names_from_entries(entries: Vec<CertEntry>) -> BTreeSet<String> {
    entries
        .into_iter()
        .flat_map(|entry| {
            let sans: Vec<String> = entry
                .name_value
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect();
            entry.common_name.into_iter().chain(sans)
        })
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty() && !name.contains('@'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sans_are_split_and_deduplicated() {
        let body = r#"[
            {"common_name": "example.com", "name_value": "example.com\napi.example.com\nexample.org"},
            {"common_name": "*.example.com", "name_value": "*.example.com\nAPI.example.com"},
            {"common_name": "hostmaster@example.com", "name_value": ""}
        ]"#;
        let entries: Vec<CertEntry> = http::parse_json(body).unwrap();
        let names = names_from_entries(entries);

        let expected: BTreeSet<String> = ["*.example.com", "api.example.com", "example.com", "example.org"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, expected);
    }
}
