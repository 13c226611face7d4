use std::fmt;

use serde::{Deserialize, Serialize};

use super::entity::{Domain, Host, Scope, SubDomain, Webpage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Scope,
    Host,
    Domain,
    SubDomain,
    Webpage,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label: &str = match self {
            EntityKind::Scope => "scope",
            EntityKind::Host => "host",
            EntityKind::Domain => "domain",
            EntityKind::SubDomain => "subdomain",
            EntityKind::Webpage => "webpage",
        };
        f.write_str(label)
    }
}

/// Any one stored entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    Scope(Scope),
    Host(Host),
    Domain(Domain),
    SubDomain(SubDomain),
    Webpage(Webpage),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Scope(_) => EntityKind::Scope,
            Record::Host(_) => EntityKind::Host,
            Record::Domain(_) => EntityKind::Domain,
            Record::SubDomain(_) => EntityKind::SubDomain,
            Record::Webpage(_) => EntityKind::Webpage,
        }
    }

    /// The key of the record inside its scope.
    pub fn name(&self) -> String {
        match self {
            Record::Scope(scope) => scope.name.clone(),
            Record::Host(host) => host.address.to_string(),
            Record::Domain(domain) => domain.name.clone(),
            Record::SubDomain(subdomain) => subdomain.name.clone(),
            Record::Webpage(webpage) => webpage.url.clone(),
        }
    }

    pub fn scope(&self) -> &str {
        match self {
            Record::Scope(scope) => &scope.name,
            Record::Host(host) => &host.scope,
            Record::Domain(domain) => &domain.scope,
            Record::SubDomain(subdomain) => &subdomain.scope,
            Record::Webpage(webpage) => &webpage.scope,
        }
    }

    pub fn as_domain(&self) -> Option<&Domain> {
        match self {
            Record::Domain(domain) => Some(domain),
            _ => None,
        }
    }

    pub fn as_subdomain(&self) -> Option<&SubDomain> {
        match self {
            Record::SubDomain(subdomain) => Some(subdomain),
            _ => None,
        }
    }
}

impl From<Host> for Record {
    fn from(host: Host) -> Self {
        Record::Host(host)
    }
}

impl From<Domain> for Record {
    fn from(domain: Domain) -> Self {
        Record::Domain(domain)
    }
}

impl From<SubDomain> for Record {
    fn from(subdomain: SubDomain) -> Self {
        Record::SubDomain(subdomain)
    }
}

impl From<Webpage> for Record {
    fn from(webpage: Webpage) -> Self {
        Record::Webpage(webpage)
    }
}
