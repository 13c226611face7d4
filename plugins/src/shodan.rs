//! Shodan API plugins. Both need `SHODAN_API_KEY`.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use scopr_common::error::{ModuleError, ProviderError};
use scopr_common::model::{Attribute, EntityKind, Enrichment};
use scopr_common::ports::{DiscoveryProvider, EnumerationModule, TargetKind};

use crate::http::{self, HttpClient};

const SHODAN_API: &str = "https://api.shodan.io";

#[derive(Debug, Deserialize)]
struct DomainInfo {
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    subdomains: Vec<String>,
}

pub struct ShodanDomain {
    http: HttpClient,
    api_key: String,
}

impl ShodanDomain {
    pub const NAME: &'static str = "shodan_domain";

    pub fn new(http: HttpClient, api_key: String) -> Self {
        Self { http, api_key }
    }
}

#[async_trait]
impl DiscoveryProvider for ShodanDomain {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn accepts(&self, target: TargetKind) -> bool {
        target == TargetKind::Domain
    }

    async fn discover(&self, target: &str) -> Result<BTreeSet<String>, ProviderError> {
        let base: String = format!("{SHODAN_API}/dns/domain/{target}");
        let url = http::endpoint(&base, &[("key", &self.api_key)])
            .map_err(|kind| ProviderError::new(Self::NAME, target, kind))?;
        let info: DomainInfo = self
            .http
            .get_json(url)
            .await
            .map_err(|kind| ProviderError::new(Self::NAME, target, kind))?;

        Ok(expand_subdomains(target, info))
    }
}

/// Shodan lists bare labels (`www`, `mail.eu`); they are joined to the domain.
fn expand_subdomains(target: &str, info: DomainInfo) -> BTreeSet<String> {
    let domain: String = info.domain.unwrap_or_else(|| target.to_string());
    info.subdomains
        .into_iter()
        .map(|label| label.trim().to_ascii_lowercase())
        .filter(|label| !label.is_empty())
        .map(|label| format!("{label}.{domain}"))
        .collect()
}

/// Open ports, banners and hostnames Shodan knows for an address.
pub struct ShodanHost {
    http: HttpClient,
    api_key: String,
}

impl ShodanHost {
    pub const NAME: &'static str = "shodan_host";

    pub fn new(http: HttpClient, api_key: String) -> Self {
        Self { http, api_key }
    }
}

#[async_trait]
impl EnumerationModule for ShodanHost {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn attribute(&self) -> Attribute {
        Attribute::Shodan
    }

    fn applies_to(&self, kind: EntityKind) -> bool {
        kind == EntityKind::Host
    }

    async fn enumerate(&self, target: &str) -> Result<Enrichment, ModuleError> {
        let base: String = format!("{SHODAN_API}/shodan/host/{target}");
        let url = http::endpoint(&base, &[("key", &self.api_key), ("minify", "true")])
            .map_err(|kind| ModuleError::new(Self::NAME, target, kind))?;
        let host: Value = self
            .http
            .get_json(url)
            .await
            .map_err(|kind| ModuleError::new(Self::NAME, target, kind))?;

        Ok(Enrichment::Shodan(host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_joined_to_domain() {
        let info: DomainInfo =
            http::parse_json(r#"{"domain": "example.com", "subdomains": ["www", "Mail.EU", ""]}"#).unwrap();
        let names = expand_subdomains("example.com", info);
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["mail.eu.example.com".to_string(), "www.example.com".to_string()]
        );
    }
}
