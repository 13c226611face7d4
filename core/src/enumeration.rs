//! # Enumeration Engine
//!
//! Annotates every entity already in scope, one pass per entity, in the order
//! **Host → Domain → SubDomain → Webpage**.
//!
//! Domains and subdomains are resolved before anything else touches them, so
//! the comparator always works on current addresses. Each module owns one
//! attribute; when a module fails that attribute is nulled and the failure is
//! recorded, but the remaining modules and entities still run. Nothing here is
//! transactional: whatever was written before a stop stays written.

use std::net::IpAddr;
use std::sync::Arc;

use futures::future::join_all;

use scopr_common::cancel::StopSignal;
use scopr_common::error::ModuleError;
use scopr_common::events::{Component, EventLog, Outcome};
use scopr_common::model::{EntityKind, Enrichment, FieldUpdate};
use scopr_common::ports::{EnumerationModule, Resolver};

use crate::repository::ScopeRepository;

/// Counts of one enumeration pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnumerationSummary {
    pub entities: usize,
    pub updated: usize,
    pub failed: usize,
    pub stopped: bool,
}

pub struct EnumerationEngine {
    repo: ScopeRepository,
    modules: Vec<Arc<dyn EnumerationModule>>,
    resolver: Arc<dyn Resolver>,
    events: EventLog,
    stop: StopSignal,
}

impl EnumerationEngine {
    pub fn new(
        repo: ScopeRepository,
        modules: Vec<Arc<dyn EnumerationModule>>,
        resolver: Arc<dyn Resolver>,
        events: EventLog,
        stop: StopSignal,
    ) -> Self {
        Self {
            repo,
            modules,
            resolver,
            events,
            stop,
        }
    }

    /// Enumerates the whole scope.
    pub async fn enumerate_all(&self) -> EnumerationSummary {
        let mut summary = EnumerationSummary::default();

        let targets: Vec<(EntityKind, String)> = match self.targets().await {
            Ok(targets) => targets,
            Err(reason) => {
                self.events
                    .record(Component::Enumeration, self.repo.scope().to_string(), Outcome::Failed(reason));
                summary.failed += 1;
                return summary;
            }
        };

        for (kind, name) in targets {
            if self.stop.is_stopped() {
                self.events
                    .record(Component::Enumeration, format!("{kind} {name}"), Outcome::Skipped("stopped".into()));
                summary.stopped = true;
                continue;
            }

            let (updated, failed) = self.enumerate(kind, &name).await;
            summary.entities += 1;
            summary.updated += updated;
            summary.failed += failed;
        }

        summary
    }

    /// Runs resolution (for names) and every applicable module on one entity.
    ///
    /// # Returns
    /// The number of attributes written and the number of failures.
    pub async fn enumerate(&self, kind: EntityKind, name: &str) -> (usize, usize) {
        let mut updated: usize = 0;
        let mut failed: usize = 0;

        if matches!(kind, EntityKind::Domain | EntityKind::SubDomain) {
            let (ok, update) = self.resolve(kind, name).await;
            if !ok {
                failed += 1;
            }
            if self.write(kind, name, update).await {
                updated += 1;
            } else {
                failed += 1;
            }
        }

        let applicable: Vec<&Arc<dyn EnumerationModule>> =
            self.modules.iter().filter(|m| m.applies_to(kind)).collect();
        let results: Vec<Result<Enrichment, ModuleError>> =
            join_all(applicable.iter().map(|m| m.enumerate(name))).await;

        for (module, result) in applicable.iter().zip(results) {
            let update: FieldUpdate = match result {
                Ok(enrichment) if enrichment.attribute() == module.attribute() => enrichment.into(),
                Ok(enrichment) => {
                    failed += 1;
                    self.events.record(
                        Component::Enumeration,
                        format!("{kind} {name}"),
                        Outcome::Failed(format!(
                            "{}: returned {} instead of {}",
                            module.name(),
                            enrichment.attribute(),
                            module.attribute()
                        )),
                    );
                    FieldUpdate::cleared(module.attribute())
                }
                Err(e) => {
                    failed += 1;
                    self.events
                        .record(Component::Enumeration, format!("{kind} {name}"), Outcome::Failed(e.to_string()));
                    FieldUpdate::cleared(module.attribute())
                }
            };

            if self.write(kind, name, update).await {
                updated += 1;
            } else {
                failed += 1;
            }
        }

        (updated, failed)
    }

    async fn resolve(&self, kind: EntityKind, name: &str) -> (bool, FieldUpdate) {
        match self.resolver.resolve(name).await {
            Ok(ip) => (true, FieldUpdate::ResolvedIp(ip)),
            Err(e) => {
                self.events.record(
                    Component::Enumeration,
                    format!("{kind} {name}"),
                    Outcome::Failed(format!("resolve: {e}")),
                );
                (false, FieldUpdate::ResolvedIp(None))
            }
        }
    }

    async fn write(&self, kind: EntityKind, name: &str, update: FieldUpdate) -> bool {
        let field: &'static str = update.field();
        let entity: String = format!("{kind} {name}");
        match self.repo.update(kind, name, update).await {
            Ok(()) => {
                self.events
                    .record(Component::Enumeration, entity, Outcome::Updated);
                true
            }
            Err(e) => {
                self.events
                    .record(Component::Enumeration, entity, Outcome::Failed(format!("{field}: {e}")));
                false
            }
        }
    }

    async fn targets(&self) -> Result<Vec<(EntityKind, String)>, String> {
        let hosts: Vec<IpAddr> = self
            .repo
            .hosts()
            .await
            .map_err(|e| e.to_string())?
            .into_iter()
            .map(|h| h.address)
            .collect();
        let domains = self.repo.domains().await.map_err(|e| e.to_string())?;
        let subdomains = self.repo.subdomains().await.map_err(|e| e.to_string())?;
        let webpages = self.repo.webpages().await.map_err(|e| e.to_string())?;

        let mut targets: Vec<(EntityKind, String)> = Vec::new();
        targets.extend(hosts.into_iter().map(|ip| (EntityKind::Host, ip.to_string())));
        targets.extend(domains.into_iter().map(|d| (EntityKind::Domain, d.name)));
        targets.extend(subdomains.into_iter().map(|s| (EntityKind::SubDomain, s.name)));
        targets.extend(webpages.into_iter().map(|w| (EntityKind::Webpage, w.url)));
        Ok(targets)
    }
}
