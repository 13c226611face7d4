use std::collections::BTreeSet;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub name: String,
}

/// One address that a name pointed to at some point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpHistoryEntry {
    pub ip: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub scope: String,
    pub address: IpAddr,
    #[serde(default)]
    pub whois: Option<Value>,
    #[serde(default)]
    pub shodan: Option<Value>,
    #[serde(default)]
    pub ip_history: Option<Vec<IpHistoryEntry>>,
}

impl Host {
    pub fn new(scope: &str, address: IpAddr) -> Self {
        Self {
            scope: scope.to_string(),
            address,
            whois: None,
            shodan: None,
            ip_history: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub scope: String,
    pub name: String,
    #[serde(default)]
    pub ip: Option<IpAddr>,
    #[serde(default)]
    pub ip_history: Option<Vec<IpHistoryEntry>>,
}

impl Domain {
    pub fn new(scope: &str, name: &str) -> Self {
        Self {
            scope: scope.to_string(),
            name: name.to_string(),
            ip: None,
            ip_history: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubDomain {
    pub scope: String,
    pub name: String,
    /// Name of the apex [`Domain`] this subdomain lives under.
    pub domain: String,
    #[serde(default)]
    pub ip: Option<IpAddr>,
    /// Whether `ip` belongs to an in-scope host. Set by the comparator.
    #[serde(default)]
    pub in_scope_ip: bool,
    #[serde(default)]
    pub ip_history: Option<Vec<IpHistoryEntry>>,
    #[serde(default)]
    pub urls: BTreeSet<String>,
}

impl SubDomain {
    pub fn new(scope: &str, name: &str, domain: &str) -> Self {
        Self {
            scope: scope.to_string(),
            name: name.to_string(),
            domain: domain.to_string(),
            ip: None,
            in_scope_ip: false,
            ip_history: None,
            urls: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webpage {
    pub scope: String,
    pub url: String,
    pub subdomain: String,
    #[serde(default)]
    pub archived_urls: Option<Vec<String>>,
}

impl Webpage {
    pub fn new(scope: &str, url: &str, subdomain: &str) -> Self {
        Self {
            scope: scope.to_string(),
            url: url.to_string(),
            subdomain: subdomain.to_string(),
            archived_urls: None,
        }
    }
}
