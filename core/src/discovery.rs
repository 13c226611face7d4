//! # Discovery Engine
//!
//! Grows the scope from what is already in it.
//!
//! Every expansion asks each enabled [`DiscoveryProvider`] about one target,
//! unions the answers and runs each candidate through the name classifier.
//! Candidates that create something new feed more expansions:
//!
//! * a new **root domain** is expanded itself,
//! * a new **subdomain** sends its apex domain back to the worklist.
//!
//! Expansion is driven by an explicit worklist with a visited set. A target is
//! expanded at most once per engine, and only first-time insertions enqueue
//! anything, so provider cycles terminate and a converged scope is a fixed point.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;

use scopr_common::cancel::StopSignal;
use scopr_common::error::ProviderError;
use scopr_common::events::{Component, EventLog, Outcome};
use scopr_common::model::EntityKind;
use scopr_common::name::{self, Classified};
use scopr_common::ports::{DiscoveryProvider, DomainApproval, TargetKind};

use crate::repository::{ScopeRepository, SubdomainInsert};

/// What one `find_*` call produced.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    pub target: String,
    /// Provider output for the root target, before classification.
    pub candidates: BTreeSet<String>,
    /// Every record created during the call, in insertion order.
    pub inserted: Vec<(EntityKind, String)>,
    /// How many targets were sent to the providers.
    pub expanded: usize,
    pub failures: Vec<ProviderError>,
}

impl DiscoveryReport {
    fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            ..Self::default()
        }
    }

    pub fn inserted_count(&self, kind: EntityKind) -> usize {
        self.inserted.iter().filter(|(k, _)| *k == kind).count()
    }
}

/// Mutable state of one `find_*` call.
struct Expansion {
    queue: VecDeque<String>,
    known_apexes: BTreeSet<String>,
    report: DiscoveryReport,
}

pub struct DiscoveryEngine {
    repo: ScopeRepository,
    providers: Vec<Arc<dyn DiscoveryProvider>>,
    approval: Option<Arc<dyn DomainApproval>>,
    events: EventLog,
    stop: StopSignal,
    expanded: HashSet<(TargetKind, String)>,
    /// Provider output of every expanded target, for reports on later calls.
    answers: HashMap<(TargetKind, String), BTreeSet<String>>,
    rejected: HashSet<String>,
}

impl DiscoveryEngine {
    pub fn new(
        repo: ScopeRepository,
        providers: Vec<Arc<dyn DiscoveryProvider>>,
        events: EventLog,
        stop: StopSignal,
    ) -> Self {
        Self {
            repo,
            providers,
            approval: None,
            events,
            stop,
            expanded: HashSet::new(),
            answers: HashMap::new(),
            rejected: HashSet::new(),
        }
    }

    /// New root domains are only admitted once `approval` agrees.
    pub fn with_approval(mut self, approval: Arc<dyn DomainApproval>) -> Self {
        self.approval = Some(approval);
        self
    }

    /// Whether any enabled provider takes targets of this shape.
    pub fn has_providers(&self, kind: TargetKind) -> bool {
        self.providers.iter().any(|p| p.accepts(kind))
    }

    /// Expands `domain` and everything it leads to.
    pub async fn find_subdomains(&mut self, domain: &str) -> DiscoveryReport {
        let Some(mut run) = self.begin(domain).await else {
            return DiscoveryReport::new(domain);
        };

        let root: String = name::normalize(domain);
        run.queue.push_back(root.clone());
        self.drain(&mut run, Some(&root)).await;
        run.report
    }

    /// Asks address-aware providers about `ip`, then expands every domain they lead to.
    pub async fn find_domains(&mut self, ip: IpAddr) -> DiscoveryReport {
        let target: String = ip.to_string();
        let Some(mut run) = self.begin(&target).await else {
            return DiscoveryReport::new(&target);
        };

        if self.stop.is_stopped() {
            self.events.record(Component::Discovery, format!("host {target}"), stopped());
            return run.report;
        }

        if self.expanded.insert((TargetKind::Ip, target.clone())) {
            run.report.expanded += 1;
            let candidates: BTreeSet<String> = self.query(&target, TargetKind::Ip, &mut run.report).await;
            for candidate in &candidates {
                self.admit(candidate, &target, &mut run).await;
            }
            self.answers.insert((TargetKind::Ip, target.clone()), candidates.clone());
            run.report.candidates = candidates;
        } else {
            run.report.candidates = self.answered(TargetKind::Ip, &target);
        }

        self.drain(&mut run, None).await;
        run.report
    }

    /// Collects webpage URLs served by `subdomain`. Does not recurse.
    pub async fn find_webpages(&mut self, subdomain: &str) -> DiscoveryReport {
        let mut report = DiscoveryReport::new(subdomain);
        if self.stop.is_stopped() {
            self.events.record(Component::Discovery, format!("subdomain {subdomain}"), stopped());
            return report;
        }
        if !self.expanded.insert((TargetKind::Subdomain, subdomain.to_string())) {
            report.candidates = self.answered(TargetKind::Subdomain, subdomain);
            return report;
        }

        report.expanded += 1;
        let candidates: BTreeSet<String> = self.query(subdomain, TargetKind::Subdomain, &mut report).await;
        let no_apexes: BTreeSet<String> = BTreeSet::new();

        for candidate in &candidates {
            let url: String = match name::classify(candidate, &no_apexes) {
                Classified::Url { url, host } if host == subdomain => url,
                Classified::Invalid { raw, reason } => {
                    self.events
                        .record(Component::Discovery, format!("candidate {raw}"), Outcome::Discarded(reason.into()));
                    continue;
                }
                other => {
                    self.events.record(
                        Component::Discovery,
                        format!("candidate {candidate}"),
                        Outcome::Discarded(format!("{} is not a url of {subdomain}", other.label())),
                    );
                    continue;
                }
            };

            let entity: String = format!("webpage {url}");
            match self.repo.new_webpage(&url, subdomain).await {
                Ok(true) => {
                    self.events.record(Component::Discovery, entity, Outcome::Inserted);
                    report.inserted.push((EntityKind::Webpage, url));
                }
                Ok(false) => self.events.record(Component::Discovery, entity, Outcome::AlreadyPresent),
                Err(e) => self.events.record(Component::Discovery, entity, Outcome::Failed(e.to_string())),
            }
        }

        self.answers
            .insert((TargetKind::Subdomain, subdomain.to_string()), candidates.clone());
        report.candidates = candidates;
        report
    }

    async fn begin(&self, target: &str) -> Option<Expansion> {
        match self.repo.apexes().await {
            Ok(known_apexes) => Some(Expansion {
                queue: VecDeque::new(),
                known_apexes,
                report: DiscoveryReport::new(target),
            }),
            Err(e) => {
                self.events
                    .record(Component::Discovery, target.to_string(), Outcome::Failed(e.to_string()));
                None
            }
        }
    }

    async fn drain(&mut self, run: &mut Expansion, root: Option<&str>) {
        while let Some(target) = run.queue.pop_front() {
            if self.stop.is_stopped() {
                self.events.record(Component::Discovery, format!("domain {target}"), stopped());
                for pending in run.queue.drain(..) {
                    self.events.record(Component::Discovery, format!("domain {pending}"), stopped());
                }
                break;
            }
            let is_root: bool = root == Some(target.as_str());
            if !self.expanded.insert((TargetKind::Domain, target.clone())) {
                if is_root {
                    run.report.candidates = self.answered(TargetKind::Domain, &target);
                }
                continue;
            }

            run.report.expanded += 1;
            let candidates: BTreeSet<String> = self.query(&target, TargetKind::Domain, &mut run.report).await;
            for candidate in &candidates {
                self.admit(candidate, &target, run).await;
            }
            self.answers.insert((TargetKind::Domain, target), candidates.clone());
            if is_root {
                run.report.candidates = candidates;
            }
        }
    }

    /// Provider output from an earlier expansion of `target`.
    fn answered(&self, kind: TargetKind, target: &str) -> BTreeSet<String> {
        self.answers
            .get(&(kind, target.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Runs every provider accepting `kind` against `target` and unions their output.
    async fn query(&self, target: &str, kind: TargetKind, report: &mut DiscoveryReport) -> BTreeSet<String> {
        let providers: Vec<&Arc<dyn DiscoveryProvider>> =
            self.providers.iter().filter(|p| p.accepts(kind)).collect();
        let results = join_all(providers.iter().map(|p| p.discover(target))).await;

        let mut candidates: BTreeSet<String> = BTreeSet::new();
        for (provider, result) in providers.iter().zip(results) {
            match result {
                Ok(found) => {
                    debug!("{} returned {} names for {target}", provider.name(), found.len());
                    candidates.extend(found);
                }
                Err(e) => {
                    self.events
                        .record(Component::Discovery, target.to_string(), Outcome::Failed(e.to_string()));
                    report.failures.push(e);
                }
            }
        }
        candidates
    }

    async fn admit(&mut self, candidate: &str, via: &str, run: &mut Expansion) {
        match name::classify(candidate, &run.known_apexes) {
            Classified::Invalid { raw, reason } => {
                self.events
                    .record(Component::Discovery, format!("candidate {raw}"), Outcome::Discarded(reason.into()));
            }
            Classified::Ip(ip) => {
                self.events.record(
                    Component::Discovery,
                    format!("host {ip}"),
                    Outcome::Skipped("hosts only enter scope through seeds".into()),
                );
            }
            Classified::Domain(domain) => {
                self.admit_domain(&domain, via, run).await;
            }
            Classified::Subdomain { name, apex } => {
                self.admit_subdomain(&name, &apex, via, run).await;
            }
            Classified::Url { url, host } => {
                let in_scope: Option<(String, String)> = match name::classify(&host, &run.known_apexes) {
                    Classified::Subdomain { name, apex } if run.known_apexes.contains(&apex) => Some((name, apex)),
                    _ => None,
                };
                let Some((sub, apex)) = in_scope else {
                    self.events.record(
                        Component::Discovery,
                        format!("candidate {url}"),
                        Outcome::Discarded("url host is not an in-scope subdomain".into()),
                    );
                    return;
                };
                if self.admit_subdomain(&sub, &apex, via, run).await {
                    self.admit_webpage(&url, &sub, run).await;
                }
            }
        }
    }

    /// Returns whether `domain` is in scope afterwards.
    async fn admit_domain(&mut self, domain: &str, via: &str, run: &mut Expansion) -> bool {
        let entity: String = format!("domain {domain}");
        if run.known_apexes.contains(domain) {
            self.events.record(Component::Discovery, entity, Outcome::AlreadyPresent);
            return true;
        }
        if !self.approved(domain, via).await {
            self.events.record(
                Component::Discovery,
                entity,
                Outcome::Discarded("rejected by operator".into()),
            );
            return false;
        }

        match self.repo.new_domain(domain).await {
            Ok(created) => {
                run.known_apexes.insert(domain.to_string());
                if created {
                    self.events.record(Component::Discovery, entity, Outcome::Inserted);
                    run.report.inserted.push((EntityKind::Domain, domain.to_string()));
                    enqueue(run, domain);
                } else {
                    self.events.record(Component::Discovery, entity, Outcome::AlreadyPresent);
                }
                true
            }
            Err(e) => {
                self.events.record(Component::Discovery, entity, Outcome::Failed(e.to_string()));
                false
            }
        }
    }

    /// Returns whether `sub` is in scope afterwards.
    async fn admit_subdomain(&mut self, sub: &str, apex: &str, via: &str, run: &mut Expansion) -> bool {
        let entity: String = format!("subdomain {sub}");
        if !run.known_apexes.contains(apex) && !self.approved(apex, via).await {
            self.events.record(
                Component::Discovery,
                entity,
                Outcome::Discarded(format!("apex {apex} not approved")),
            );
            return false;
        }

        let insert: SubdomainInsert = match self.repo.new_subdomain(sub, apex).await {
            Ok(insert) => insert,
            Err(e) => {
                self.events.record(Component::Discovery, entity, Outcome::Failed(e.to_string()));
                return false;
            }
        };

        run.known_apexes.insert(apex.to_string());
        if insert.domain_created {
            self.events
                .record(Component::Discovery, format!("domain {apex}"), Outcome::Inserted);
            run.report.inserted.push((EntityKind::Domain, apex.to_string()));
        }
        if insert.subdomain_created {
            self.events.record(Component::Discovery, entity, Outcome::Inserted);
            run.report.inserted.push((EntityKind::SubDomain, sub.to_string()));
        } else {
            self.events.record(Component::Discovery, entity, Outcome::AlreadyPresent);
        }
        if insert.domain_created || insert.subdomain_created {
            enqueue(run, apex);
        }
        true
    }

    async fn admit_webpage(&mut self, url: &str, sub: &str, run: &mut Expansion) {
        let entity: String = format!("webpage {url}");
        match self.repo.new_webpage(url, sub).await {
            Ok(true) => {
                self.events.record(Component::Discovery, entity, Outcome::Inserted);
                run.report.inserted.push((EntityKind::Webpage, url.to_string()));
            }
            Ok(false) => self.events.record(Component::Discovery, entity, Outcome::AlreadyPresent),
            Err(e) => self.events.record(Component::Discovery, entity, Outcome::Failed(e.to_string())),
        }
    }

    /// Consults the approval gate once per root domain and run.
    async fn approved(&mut self, domain: &str, via: &str) -> bool {
        let Some(approval) = &self.approval else {
            return true;
        };
        if self.rejected.contains(domain) {
            return false;
        }
        if approval.approve(domain, via).await {
            return true;
        }

        self.rejected.insert(domain.to_string());
        false
    }
}

fn enqueue(run: &mut Expansion, domain: &str) {
    if !run.queue.iter().any(|pending| pending == domain) {
        run.queue.push_back(domain.to_string());
    }
}

fn stopped() -> Outcome {
    Outcome::Skipped("stopped".into())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
