//! # Scope Repository
//!
//! Typed access to one engagement inside a [`ScopeStore`].
//!
//! The engines never build [`Record`]s themselves; they call the `new_*`
//! helpers here, which enforce the structural rules of the scope:
//!
//! * **Subdomains** always have their apex domain created first.
//! * **Webpages** are linked back to their subdomain's URL set.
//!
//! Every `new_*` helper reports whether the call created the entity, which is
//! what drives discovery expansion.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;

use scopr_common::error::StoreError;
use scopr_common::model::{Domain, EntityKind, FieldUpdate, Host, Record, SubDomain, Webpage};
use scopr_common::ports::ScopeStore;

/// What a [`ScopeRepository::new_subdomain`] call created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubdomainInsert {
    pub domain_created: bool,
    pub subdomain_created: bool,
}

#[derive(Clone)]
pub struct ScopeRepository {
    store: Arc<dyn ScopeStore>,
    scope: String,
}

impl ScopeRepository {
    pub fn new(store: Arc<dyn ScopeStore>, scope: impl Into<String>) -> Self {
        Self {
            store,
            scope: scope.into(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub async fn new_scope(&self) -> Result<bool, StoreError> {
        self.store.create_scope(&self.scope).await
    }

    pub async fn new_host(&self, address: IpAddr) -> Result<bool, StoreError> {
        let host = Host::new(&self.scope, address);
        self.store.create_if_absent(&self.scope, host.into()).await
    }

    pub async fn new_domain(&self, name: &str) -> Result<bool, StoreError> {
        let domain = Domain::new(&self.scope, name);
        self.store.create_if_absent(&self.scope, domain.into()).await
    }

    /// Creates `name` under `apex`, creating the apex domain first if needed.
    pub async fn new_subdomain(&self, name: &str, apex: &str) -> Result<SubdomainInsert, StoreError> {
        let domain_created: bool = self.new_domain(apex).await?;
        let subdomain = SubDomain::new(&self.scope, name, apex);
        let subdomain_created: bool = self.store.create_if_absent(&self.scope, subdomain.into()).await?;

        Ok(SubdomainInsert {
            domain_created,
            subdomain_created,
        })
    }

    /// Creates a webpage and links its URL on the parent subdomain.
    pub async fn new_webpage(&self, url: &str, subdomain: &str) -> Result<bool, StoreError> {
        let page = Webpage::new(&self.scope, url, subdomain);
        let created: bool = self.store.create_if_absent(&self.scope, page.into()).await?;
        if created {
            self.store
                .update_fields(
                    &self.scope,
                    EntityKind::SubDomain,
                    subdomain,
                    FieldUpdate::LinkUrl(url.to_string()),
                )
                .await?;
        }
        Ok(created)
    }

    pub async fn update(&self, kind: EntityKind, name: &str, update: FieldUpdate) -> Result<(), StoreError> {
        self.store.update_fields(&self.scope, kind, name, update).await
    }

    pub async fn get(&self, kind: EntityKind, name: &str) -> Result<Option<Record>, StoreError> {
        self.store.get(&self.scope, kind, name).await
    }

    pub async fn hosts(&self) -> Result<Vec<Host>, StoreError> {
        let records: Vec<Record> = self.store.list(&self.scope, EntityKind::Host).await?;
        Ok(records
            .into_iter()
            .filter_map(|r| match r {
                Record::Host(host) => Some(host),
                _ => None,
            })
            .collect())
    }

    pub async fn domains(&self) -> Result<Vec<Domain>, StoreError> {
        let records: Vec<Record> = self.store.list(&self.scope, EntityKind::Domain).await?;
        Ok(records
            .into_iter()
            .filter_map(|r| match r {
                Record::Domain(domain) => Some(domain),
                _ => None,
            })
            .collect())
    }

    pub async fn subdomains(&self) -> Result<Vec<SubDomain>, StoreError> {
        let records: Vec<Record> = self.store.list(&self.scope, EntityKind::SubDomain).await?;
        Ok(records
            .into_iter()
            .filter_map(|r| match r {
                Record::SubDomain(sub) => Some(sub),
                _ => None,
            })
            .collect())
    }

    pub async fn webpages(&self) -> Result<Vec<Webpage>, StoreError> {
        let records: Vec<Record> = self.store.list(&self.scope, EntityKind::Webpage).await?;
        Ok(records
            .into_iter()
            .filter_map(|r| match r {
                Record::Webpage(page) => Some(page),
                _ => None,
            })
            .collect())
    }

    /// Names of the root domains currently in scope.
    pub async fn apexes(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self.domains().await?.into_iter().map(|d| d.name).collect())
    }

    pub async fn host_addresses(&self) -> Result<BTreeSet<IpAddr>, StoreError> {
        Ok(self.hosts().await?.into_iter().map(|h| h.address).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn repository() -> ScopeRepository {
        let repo = ScopeRepository::new(Arc::new(MemoryStore::new()), "acme");
        repo.new_scope().await.unwrap();
        repo
    }

    #[tokio::test]
    async fn subdomain_creates_its_apex() {
        let repo = repository().await;

        let first = repo.new_subdomain("api.example.com", "example.com").await.unwrap();
        assert_eq!(
            first,
            SubdomainInsert {
                domain_created: true,
                subdomain_created: true
            }
        );

        let second = repo.new_subdomain("www.example.com", "example.com").await.unwrap();
        assert!(!second.domain_created);
        assert!(second.subdomain_created);

        assert_eq!(repo.apexes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn webpage_is_linked_once() {
        let repo = repository().await;
        repo.new_subdomain("www.example.com", "example.com").await.unwrap();

        assert!(repo.new_webpage("https://www.example.com/login", "www.example.com").await.unwrap());
        assert!(!repo.new_webpage("https://www.example.com/login", "www.example.com").await.unwrap());

        let subs = repo.subdomains().await.unwrap();
        assert_eq!(subs[0].urls.len(), 1);
        assert_eq!(repo.webpages().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn hosts_are_keyed_by_address() {
        let repo = repository().await;
        let ip: IpAddr = "10.0.0.5".parse().unwrap();
        assert!(repo.new_host(ip).await.unwrap());
        assert!(!repo.new_host(ip).await.unwrap());
        assert!(repo.host_addresses().await.unwrap().contains(&ip));
    }
}
