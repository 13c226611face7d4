use std::fmt;
use std::net::IpAddr;

use serde_json::Value;

use super::entity::IpHistoryEntry;
use super::record::{EntityKind, Record};
use crate::error::StoreError;

/// An attribute filled in by an enumeration module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Whois,
    Shodan,
    IpHistory,
    ArchivedUrls,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label: &str = match self {
            Attribute::Whois => "whois",
            Attribute::Shodan => "shodan",
            Attribute::IpHistory => "ip_history",
            Attribute::ArchivedUrls => "archived_urls",
        };
        f.write_str(label)
    }
}

/// What a successful enumeration module call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment {
    Whois(Value),
    Shodan(Value),
    IpHistory(Vec<IpHistoryEntry>),
    ArchivedUrls(Vec<String>),
}

impl Enrichment {
    pub fn attribute(&self) -> Attribute {
        match self {
            Enrichment::Whois(_) => Attribute::Whois,
            Enrichment::Shodan(_) => Attribute::Shodan,
            Enrichment::IpHistory(_) => Attribute::IpHistory,
            Enrichment::ArchivedUrls(_) => Attribute::ArchivedUrls,
        }
    }
}

/// A single attribute write against a stored record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    ResolvedIp(Option<IpAddr>),
    InScopeIp(bool),
    Whois(Option<Value>),
    Shodan(Option<Value>),
    IpHistory(Option<Vec<IpHistoryEntry>>),
    ArchivedUrls(Option<Vec<String>>),
    /// Associates a webpage URL with a subdomain.
    LinkUrl(String),
}

impl From<Enrichment> for FieldUpdate {
    fn from(enrichment: Enrichment) -> Self {
        match enrichment {
            Enrichment::Whois(value) => FieldUpdate::Whois(Some(value)),
            Enrichment::Shodan(value) => FieldUpdate::Shodan(Some(value)),
            Enrichment::IpHistory(entries) => FieldUpdate::IpHistory(Some(entries)),
            Enrichment::ArchivedUrls(urls) => FieldUpdate::ArchivedUrls(Some(urls)),
        }
    }
}

impl FieldUpdate {
    /// The update that nulls `attribute` after its module failed.
    pub fn cleared(attribute: Attribute) -> Self {
        match attribute {
            Attribute::Whois => FieldUpdate::Whois(None),
            Attribute::Shodan => FieldUpdate::Shodan(None),
            Attribute::IpHistory => FieldUpdate::IpHistory(None),
            Attribute::ArchivedUrls => FieldUpdate::ArchivedUrls(None),
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            FieldUpdate::ResolvedIp(_) => "ip",
            FieldUpdate::InScopeIp(_) => "in_scope_ip",
            FieldUpdate::Whois(_) => "whois",
            FieldUpdate::Shodan(_) => "shodan",
            FieldUpdate::IpHistory(_) => "ip_history",
            FieldUpdate::ArchivedUrls(_) => "archived_urls",
            FieldUpdate::LinkUrl(_) => "urls",
        }
    }

    /// Writes the update into `record`. Last write wins.
    pub fn apply(self, record: &mut Record) -> Result<(), StoreError> {
        let kind: EntityKind = record.kind();
        let field: &'static str = self.field();

        match (record, self) {
            (Record::Host(host), FieldUpdate::Whois(value)) => host.whois = value,
            (Record::Host(host), FieldUpdate::Shodan(value)) => host.shodan = value,
            (Record::Host(host), FieldUpdate::IpHistory(entries)) => host.ip_history = entries,

            (Record::Domain(domain), FieldUpdate::ResolvedIp(ip)) => domain.ip = ip,
            (Record::Domain(domain), FieldUpdate::IpHistory(entries)) => domain.ip_history = entries,

            (Record::SubDomain(sub), FieldUpdate::ResolvedIp(ip)) => sub.ip = ip,
            (Record::SubDomain(sub), FieldUpdate::InScopeIp(flag)) => sub.in_scope_ip = flag,
            (Record::SubDomain(sub), FieldUpdate::IpHistory(entries)) => sub.ip_history = entries,
            (Record::SubDomain(sub), FieldUpdate::LinkUrl(url)) => {
                sub.urls.insert(url);
            }

            (Record::Webpage(page), FieldUpdate::ArchivedUrls(urls)) => page.archived_urls = urls,

            _ => return Err(StoreError::FieldMismatch { kind, field }),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Domain, Host, SubDomain};
    use std::net::Ipv4Addr;

    #[test]
    fn resolved_ip_is_recomputed_not_merged() {
        let mut record = Record::Domain(Domain::new("acme", "example.com"));
        let first = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5));

        FieldUpdate::ResolvedIp(Some(first)).apply(&mut record).unwrap();
        FieldUpdate::ResolvedIp(None).apply(&mut record).unwrap();

        assert_eq!(record.as_domain().unwrap().ip, None);
    }

    #[test]
    fn link_url_accumulates() {
        let mut record = Record::SubDomain(SubDomain::new("acme", "www.example.com", "example.com"));
        FieldUpdate::LinkUrl("https://www.example.com/a".into()).apply(&mut record).unwrap();
        FieldUpdate::LinkUrl("https://www.example.com/a".into()).apply(&mut record).unwrap();
        FieldUpdate::LinkUrl("https://www.example.com/b".into()).apply(&mut record).unwrap();

        assert_eq!(record.as_subdomain().unwrap().urls.len(), 2);
    }

    #[test]
    fn mismatched_field_is_rejected() {
        let mut record = Record::Host(Host::new("acme", IpAddr::V4(Ipv4Addr::LOCALHOST)));
        let result = FieldUpdate::InScopeIp(true).apply(&mut record);
        assert!(matches!(
            result,
            Err(StoreError::FieldMismatch { kind: EntityKind::Host, field: "in_scope_ip" })
        ));
    }

    #[test]
    fn cleared_matches_enrichment_attribute() {
        let enrichment = Enrichment::ArchivedUrls(vec![]);
        assert_eq!(
            FieldUpdate::cleared(enrichment.attribute()),
            FieldUpdate::ArchivedUrls(None)
        );
    }
}
