//! # Run Pipeline
//!
//! One engagement run, start to finish:
//!
//! 1. **Seeds**: the operator's files enter the scope.
//! 2. **Discovery**: hosts lead to domains, domains to subdomains, subdomains
//!    to webpages.
//! 3. **Comparison**: subdomains are matched against in-scope hosts.
//! 4. **Enumeration**: every entity is annotated and names are re-resolved.
//!    Comparison runs once more afterwards so the flags follow the fresh
//!    addresses.
//! 5. **Export**: the scope tree is built for the report.
//!
//! A stop request ends discovery or enumeration at the next entity boundary.
//! A stop during discovery skips enumeration entirely. The tree is always
//! built from whatever the store holds.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use scopr_common::cancel::StopSignal;
use scopr_common::config::{RunConfig, SeedFiles};
use scopr_common::events::{Component, Event, EventLog, Outcome};
use scopr_common::model::{Domain, EntityKind, SubDomain};
use scopr_common::ports::{DomainApproval, Resolver, ScopeStore, TargetKind};
use scopr_common::{info, success};
use scopr_plugins::Modules;

use crate::comparator::{self, ComparisonSummary};
use crate::discovery::{DiscoveryEngine, DiscoveryReport};
use crate::enumeration::{EnumerationEngine, EnumerationSummary};
use crate::export::{self, Node};
use crate::repository::ScopeRepository;
use crate::seeds::{self, SeedSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Seeds,
    Discovery,
    Comparison,
    Enumeration,
    Export,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label: &str = match self {
            Phase::Seeds => "seeds",
            Phase::Discovery => "discovery",
            Phase::Comparison => "comparison",
            Phase::Enumeration => "enumeration",
            Phase::Export => "export",
        };
        f.write_str(label)
    }
}

/// Called with the phase and the entity being worked on.
pub type ProgressFn = Box<dyn Fn(Phase, &str) + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoverySummary {
    pub domains: usize,
    pub subdomains: usize,
    pub webpages: usize,
    pub expanded: usize,
    pub failures: usize,
}

impl DiscoverySummary {
    fn absorb(&mut self, report: &DiscoveryReport) {
        self.domains += report.inserted_count(EntityKind::Domain);
        self.subdomains += report.inserted_count(EntityKind::SubDomain);
        self.webpages += report.inserted_count(EntityKind::Webpage);
        self.expanded += report.expanded;
        self.failures += report.failures.len();
    }
}

/// Everything a finished (or stopped) run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub tree: Node,
    pub seeds: SeedSummary,
    pub discovery: DiscoverySummary,
    pub comparison: ComparisonSummary,
    pub enumeration: EnumerationSummary,
    pub diagnostics: Vec<Event>,
    pub stopped: bool,
}

pub struct Pipeline {
    repo: ScopeRepository,
    seeds: SeedFiles,
    discovery: DiscoveryEngine,
    enumeration: EnumerationEngine,
    events: EventLog,
    stop: StopSignal,
    on_progress: Option<ProgressFn>,
}

impl Pipeline {
    pub fn new(
        cfg: &RunConfig,
        store: Arc<dyn ScopeStore>,
        modules: Modules,
        resolver: Arc<dyn Resolver>,
        stop: StopSignal,
    ) -> Self {
        let repo = ScopeRepository::new(store, cfg.name.clone());
        let events = EventLog::new();

        let discovery = DiscoveryEngine::new(repo.clone(), modules.providers, events.clone(), stop.clone());
        let enumeration = EnumerationEngine::new(
            repo.clone(),
            modules.enumerators,
            resolver,
            events.clone(),
            stop.clone(),
        );

        Self {
            repo,
            seeds: cfg.seeds.clone(),
            discovery,
            enumeration,
            events,
            stop,
            on_progress: None,
        }
    }

    /// Gates newly discovered root domains behind `approval`.
    pub fn with_approval(mut self, approval: Arc<dyn DomainApproval>) -> Self {
        self.discovery = self.discovery.with_approval(approval);
        self
    }

    pub fn on_progress(mut self, callback: ProgressFn) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn events(&self) -> EventLog {
        self.events.clone()
    }

    pub async fn run(&mut self) -> anyhow::Result<RunOutcome> {
        if self.repo.new_scope().await? {
            success!("Created scope {}", self.repo.scope());
        } else {
            info!("Resuming scope {}", self.repo.scope());
        }

        self.progress(Phase::Seeds, self.repo.scope());
        let seeds: SeedSummary = seeds::load_seeds(&self.repo, &self.seeds, &self.events).await?;
        info!(
            "Seeded {} hosts, {} domains, {} subdomains ({} skipped)",
            seeds.hosts, seeds.domains, seeds.subdomains, seeds.skipped
        );

        let discovery: DiscoverySummary = self.discover().await?;
        info!(
            "Discovery found {} domains, {} subdomains, {} webpages",
            discovery.domains, discovery.subdomains, discovery.webpages
        );

        let mut comparison: ComparisonSummary = ComparisonSummary::default();
        let mut enumeration: EnumerationSummary = EnumerationSummary::default();
        if !self.stop.is_stopped() {
            self.progress(Phase::Comparison, self.repo.scope());
            comparator::compare(&self.repo, &self.events).await;

            self.progress(Phase::Enumeration, self.repo.scope());
            enumeration = self.enumeration.enumerate_all().await;

            self.progress(Phase::Comparison, self.repo.scope());
            comparison = comparator::compare(&self.repo, &self.events).await;
            info!(
                "{} subdomains resolve to in-scope hosts, {} do not",
                comparison.matched.len(),
                comparison.unmatched.len() + comparison.unresolved.len()
            );
        }

        self.progress(Phase::Export, self.repo.scope());
        let entity: String = format!("scope {}", self.repo.scope());
        let tree: Node = match export::build_tree(&self.repo).await {
            Ok(tree) => tree,
            Err(e) => {
                self.events
                    .record(Component::Export, entity, Outcome::Failed(e.to_string()));
                return Err(e.into());
            }
        };
        self.events.record(Component::Export, entity, Outcome::Updated);

        Ok(RunOutcome {
            tree,
            seeds,
            discovery,
            comparison,
            enumeration,
            diagnostics: self.events.diagnostics(),
            stopped: self.stop.is_stopped(),
        })
    }

    async fn discover(&mut self) -> anyhow::Result<DiscoverySummary> {
        let mut summary = DiscoverySummary::default();

        if self.discovery.has_providers(TargetKind::Ip) {
            let hosts: Vec<IpAddr> = self.repo.host_addresses().await?.into_iter().collect();
            for ip in hosts {
                if self.stop.is_stopped() {
                    return Ok(summary);
                }
                self.progress(Phase::Discovery, &ip.to_string());
                let report: DiscoveryReport = self.discovery.find_domains(ip).await;
                summary.absorb(&report);
            }
        }

        let domains: Vec<Domain> = self.repo.domains().await?;
        for domain in domains {
            if self.stop.is_stopped() {
                return Ok(summary);
            }
            self.progress(Phase::Discovery, &domain.name);
            let report: DiscoveryReport = self.discovery.find_subdomains(&domain.name).await;
            summary.absorb(&report);
        }

        if self.discovery.has_providers(TargetKind::Subdomain) {
            let subdomains: Vec<SubDomain> = self.repo.subdomains().await?;
            for sub in subdomains {
                if self.stop.is_stopped() {
                    return Ok(summary);
                }
                self.progress(Phase::Discovery, &sub.name);
                let report: DiscoveryReport = self.discovery.find_webpages(&sub.name).await;
                summary.absorb(&report);
            }
        }

        Ok(summary)
    }

    fn progress(&self, phase: Phase, entity: &str) {
        if let Some(callback) = &self.on_progress {
            callback(phase, entity);
        }
    }
}
