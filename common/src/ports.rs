//! # Ports
//!
//! The traits the engines are written against. Concrete stores live in
//! `scopr-core`, concrete providers and modules in `scopr-plugins`, the DNS
//! resolver in `scopr-protocols`.
//!
//! ## Rules
//! 1. Only traits and the small value types they exchange belong here.
//! 2. Providers and modules report failure through their `Result`; they never
//!    panic across the engine boundary.

use std::collections::BTreeSet;
use std::net::IpAddr;

use async_trait::async_trait;

use crate::error::{ModuleError, ProviderError, ResolveError, StoreError};
use crate::model::{Attribute, EntityKind, Enrichment, FieldUpdate, Record};

/// The shape of the name handed to a discovery provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Ip,
    Domain,
    Subdomain,
}

/// A data source yielding names related to one name or address.
///
/// Output carries no guarantee of correctness, completeness or format; every
/// candidate goes through [`crate::name::classify`] before use.
#[async_trait]
pub trait DiscoveryProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn accepts(&self, target: TargetKind) -> bool;

    async fn discover(&self, target: &str) -> Result<BTreeSet<String>, ProviderError>;
}

/// A data source yielding metadata for an entity already in scope.
#[async_trait]
pub trait EnumerationModule: Send + Sync {
    fn name(&self) -> &'static str;

    /// The attribute this module fills, nulled when the module fails.
    fn attribute(&self) -> Attribute;

    fn applies_to(&self, kind: EntityKind) -> bool;

    async fn enumerate(&self, target: &str) -> Result<Enrichment, ModuleError>;
}

/// Forward name resolution.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Returns the first address `name` resolves to, `None` when it has none.
    async fn resolve(&self, name: &str) -> Result<Option<IpAddr>, ResolveError>;
}

/// Keyed record storage partitioned by scope.
///
/// `create_if_absent` is an atomic check-and-insert and is the only
/// synchronisation the engines rely on.
#[async_trait]
pub trait ScopeStore: Send + Sync {
    /// Creates the scope root. Returns `false` if it already existed.
    async fn create_scope(&self, scope: &str) -> Result<bool, StoreError>;

    /// Inserts `record` unless one of the same kind and name exists.
    ///
    /// # Returns
    /// * `true` - the record was created by this call.
    /// * `false` - the key was already present; nothing changed.
    async fn create_if_absent(&self, scope: &str, record: Record) -> Result<bool, StoreError>;

    async fn get(&self, scope: &str, kind: EntityKind, name: &str) -> Result<Option<Record>, StoreError>;

    async fn list(&self, scope: &str, kind: EntityKind) -> Result<Vec<Record>, StoreError>;

    async fn update_fields(
        &self,
        scope: &str,
        kind: EntityKind,
        name: &str,
        update: FieldUpdate,
    ) -> Result<(), StoreError>;
}

/// Decides whether a newly discovered root domain may join the scope.
#[async_trait]
pub trait DomainApproval: Send + Sync {
    async fn approve(&self, domain: &str, found_via: &str) -> bool;
}
