use async_trait::async_trait;
use serde_json::{Map, Value};

use scopr_common::error::{FailureKind, ModuleError};
use scopr_common::model::{Attribute, EntityKind, Enrichment};
use scopr_common::ports::EnumerationModule;

use crate::http::HttpClient;

const RDAP_IP_URL: &str = "https://rdap.org/ip/";

/// Registration data for an address, via the RDAP bootstrap redirector.
pub struct WhoisIp {
    http: HttpClient,
}

impl WhoisIp {
    pub const NAME: &'static str = "whois_ip";

    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl EnumerationModule for WhoisIp {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn attribute(&self) -> Attribute {
        Attribute::Whois
    }

    fn applies_to(&self, kind: EntityKind) -> bool {
        kind == EntityKind::Host
    }

    async fn enumerate(&self, target: &str) -> Result<Enrichment, ModuleError> {
        let url = url::Url::parse(&format!("{RDAP_IP_URL}{target}"))
            .map_err(|e| ModuleError::new(Self::NAME, target, FailureKind::Malformed(e.to_string())))?;

        let record: Value = self
            .http
            .get_json(url)
            .await
            .map_err(|kind| ModuleError::new(Self::NAME, target, kind))?;

        registration(record)
            .map(Enrichment::Whois)
            .map_err(|kind| ModuleError::new(Self::NAME, target, kind))
    }
}

/// Fields of an RDAP network object worth keeping. RDAP error objects and
/// responses without a handle are rejected.
fn registration(record: Value) -> Result<Value, FailureKind> {
    if let Some(code) = record.get("errorCode").and_then(Value::as_u64) {
        return Err(FailureKind::Status(u16::try_from(code).unwrap_or(u16::MAX)));
    }
    let Some(handle) = record.get("handle").and_then(Value::as_str) else {
        return Err(FailureKind::Malformed("rdap object without handle".into()));
    };

    let mut kept: Map<String, Value> = Map::new();
    kept.insert("handle".into(), Value::from(handle));
    for key in ["name", "type", "country", "startAddress", "endAddress", "parentHandle"] {
        if let Some(value) = record.get(key).filter(|v| !v.is_null()) {
            kept.insert(key.into(), value.clone());
        }
    }

    let organisations: Vec<Value> = record
        .get("entities")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entity| entity.get("handle").cloned())
        .collect();
    if !organisations.is_empty() {
        kept.insert("entities".into(), Value::Array(organisations));
    }
    Ok(Value::Object(kept))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http;

    #[test]
    fn network_object_is_trimmed() {
        let record: Value = http::parse_json(
            r#"{
                "objectClassName": "ip network",
                "handle": "NET-10-0-0-0-1",
                "name": "ACME-NET",
                "country": "US",
                "startAddress": "10.0.0.0",
                "endAddress": "10.0.0.255",
                "parentHandle": null,
                "entities": [{"handle": "ACME-1", "roles": ["registrant"]}, {"roles": ["abuse"]}],
                "notices": [{"title": "Terms of Service"}]
            }"#,
        )
        .unwrap();

        let kept = registration(record).unwrap();

        assert_eq!(kept["handle"], "NET-10-0-0-0-1");
        assert_eq!(kept["name"], "ACME-NET");
        assert_eq!(kept["entities"], serde_json::json!(["ACME-1"]));
        assert!(kept.get("notices").is_none());
        assert!(kept.get("parentHandle").is_none());
    }

    #[test]
    fn error_objects_fail() {
        let not_found: Value = http::parse_json(r#"{"errorCode": 404, "title": "Not Found"}"#).unwrap();
        assert_eq!(registration(not_found), Err(FailureKind::Status(404)));

        let empty: Value = http::parse_json("{}").unwrap();
        assert!(matches!(registration(empty), Err(FailureKind::Malformed(_))));
    }
}
