use async_trait::async_trait;
use serde::Deserialize;

use scopr_common::error::{FailureKind, ModuleError};
use scopr_common::model::{Attribute, EntityKind, Enrichment, IpHistoryEntry};
use scopr_common::ports::EnumerationModule;

use crate::http::{self, HttpClient};

const IP_HISTORY_URL: &str = "https://api.viewdns.info/iphistory/";

#[derive(Debug, Deserialize)]
struct Envelope {
    response: Option<HistoryResponse>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    records: Vec<HistoryRecord>,
}

#[derive(Debug, Deserialize)]
struct HistoryRecord {
    ip: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    lastseen: Option<String>,
}

/// Addresses a name has pointed to over time, from ViewDNS. Needs `VIEWDNS_API_KEY`.
pub struct IpHistory {
    http: HttpClient,
    api_key: String,
}

impl IpHistory {
    pub const NAME: &'static str = "ip_history";

    pub fn new(http: HttpClient, api_key: String) -> Self {
        Self { http, api_key }
    }
}

#[async_trait]
impl EnumerationModule for IpHistory {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn attribute(&self) -> Attribute {
        Attribute::IpHistory
    }

    fn applies_to(&self, kind: EntityKind) -> bool {
        matches!(kind, EntityKind::Host | EntityKind::Domain | EntityKind::SubDomain)
    }

    async fn enumerate(&self, target: &str) -> Result<Enrichment, ModuleError> {
        let url = http::endpoint(
            IP_HISTORY_URL,
            &[("domain", target), ("apikey", &self.api_key), ("output", "json")],
        )
        .map_err(|kind| ModuleError::new(Self::NAME, target, kind))?;

        let body: String = self
            .http
            .get_text(url)
            .await
            .map_err(|kind| ModuleError::new(Self::NAME, target, kind))?;

        let entries = parse_history(&body).map_err(|kind| ModuleError::new(Self::NAME, target, kind))?;
        Ok(Enrichment::IpHistory(entries))
    }
}

fn parse_history(body: &str) -> Result<Vec<IpHistoryEntry>, FailureKind> {
    let envelope: Envelope = http::parse_json(body)?;
    let response: HistoryResponse = envelope
        .response
        .ok_or_else(|| FailureKind::Malformed("missing response object".to_string()))?;

    Ok(response
        .records
        .into_iter()
        .map(|record| IpHistoryEntry {
            ip: record.ip,
            location: record.location,
            owner: record.owner,
            last_seen: record.lastseen,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_mapped() {
        let body = r#"{
            "query": {"tool": "iphistory_PRO", "domain": "example.com"},
            "response": {"records": [
                {"ip": "93.184.216.34", "location": "Norwell - United States", "owner": "Edgecast", "lastseen": "2024-01-01"},
                {"ip": "10.0.0.5"}
            ]}
        }"#;
        let entries = parse_history(body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].owner.as_deref(), Some("Edgecast"));
        assert_eq!(entries[1].last_seen, None);
    }

    #[test]
    fn missing_response_is_malformed() {
        assert!(matches!(
            parse_history(r#"{"query": {}}"#),
            Err(FailureKind::Malformed(_))
        ));
    }
}
