//! Links subdomains to in-scope hosts by address.
//!
//! A subdomain whose resolved address is one of the scope's hosts is flagged
//! `in_scope_ip`. Shared hosting and load balancers make the flag a hint, not
//! proof: two unrelated names can sit on the same address, and one name can
//! rotate across addresses between passes.

use std::collections::BTreeSet;
use std::net::IpAddr;

use scopr_common::events::{Component, EventLog, Outcome};
use scopr_common::model::{EntityKind, FieldUpdate, SubDomain};

use crate::repository::ScopeRepository;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonSummary {
    pub matched: Vec<String>,
    pub unmatched: Vec<String>,
    /// Subdomains without a resolved address. They count as unmatched.
    pub unresolved: Vec<String>,
}

/// Recomputes `in_scope_ip` for every subdomain of the scope.
pub async fn compare(repo: &ScopeRepository, events: &EventLog) -> ComparisonSummary {
    let mut summary = ComparisonSummary::default();

    let loaded = match (repo.host_addresses().await, repo.subdomains().await) {
        (Ok(hosts), Ok(subs)) => Some((hosts, subs)),
        (Err(e), _) | (_, Err(e)) => {
            events.record(Component::Comparator, repo.scope().to_string(), Outcome::Failed(e.to_string()));
            None
        }
    };
    let Some((hosts, subdomains)) = loaded else {
        return summary;
    };

    for sub in subdomains {
        let in_scope: bool = matches_host(&sub, &hosts);
        let entity: String = format!("subdomain {}", sub.name);

        if let Err(e) = repo
            .update(EntityKind::SubDomain, &sub.name, FieldUpdate::InScopeIp(in_scope))
            .await
        {
            events.record(Component::Comparator, entity, Outcome::Failed(e.to_string()));
            continue;
        }
        events.record(Component::Comparator, entity, Outcome::Updated);

        match (sub.ip, in_scope) {
            (None, _) => summary.unresolved.push(sub.name),
            (Some(_), true) => summary.matched.push(sub.name),
            (Some(_), false) => summary.unmatched.push(sub.name),
        }
    }

    summary
}

fn matches_host(sub: &SubDomain, hosts: &BTreeSet<IpAddr>) -> bool {
    sub.ip.is_some_and(|ip| hosts.contains(&ip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use scopr_common::model::Record;
    use std::sync::Arc;

    async fn subdomain_at(repo: &ScopeRepository, name: &str, ip: Option<&str>) {
        repo.new_subdomain(name, "example.com").await.unwrap();
        let ip: Option<IpAddr> = ip.map(|ip| ip.parse().unwrap());
        repo.update(EntityKind::SubDomain, name, FieldUpdate::ResolvedIp(ip))
            .await
            .unwrap();
    }

    async fn flag(repo: &ScopeRepository, name: &str) -> bool {
        let record: Option<Record> = repo.get(EntityKind::SubDomain, name).await.unwrap();
        record.as_ref().and_then(Record::as_subdomain).unwrap().in_scope_ip
    }

    #[tokio::test]
    async fn subdomains_are_matched_against_hosts() {
        let repo = ScopeRepository::new(Arc::new(MemoryStore::new()), "acme");
        repo.new_scope().await.unwrap();
        repo.new_host("10.0.0.5".parse().unwrap()).await.unwrap();
        subdomain_at(&repo, "www.example.com", Some("10.0.0.5")).await;
        subdomain_at(&repo, "api.example.com", Some("10.0.0.9")).await;
        subdomain_at(&repo, "old.example.com", None).await;

        let summary = compare(&repo, &EventLog::new()).await;

        assert_eq!(summary.matched, vec!["www.example.com"]);
        assert_eq!(summary.unmatched, vec!["api.example.com"]);
        assert_eq!(summary.unresolved, vec!["old.example.com"]);
        assert!(flag(&repo, "www.example.com").await);
        assert!(!flag(&repo, "api.example.com").await);
        assert!(!flag(&repo, "old.example.com").await);
    }

    #[tokio::test]
    async fn flag_follows_the_current_address() {
        let repo = ScopeRepository::new(Arc::new(MemoryStore::new()), "acme");
        repo.new_scope().await.unwrap();
        repo.new_host("10.0.0.5".parse().unwrap()).await.unwrap();
        subdomain_at(&repo, "www.example.com", Some("10.0.0.5")).await;
        compare(&repo, &EventLog::new()).await;

        subdomain_at(&repo, "www.example.com", Some("10.0.0.9")).await;
        compare(&repo, &EventLog::new()).await;

        assert!(!flag(&repo, "www.example.com").await);
    }
}
