//! Fakes standing in for the network-backed plugins.

use std::collections::{BTreeSet, HashMap};
use std::io::Write;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use scopr_common::config::RunConfig;
use scopr_common::error::{FailureKind, ModuleError, ProviderError, ResolveError};
use scopr_common::model::{Attribute, EntityKind, Enrichment, IpHistoryEntry};
use scopr_common::ports::{DiscoveryProvider, EnumerationModule, Resolver, TargetKind};
use scopr_plugins::Modules;

/// Answers from a fixed table, keyed by target.
pub struct TableProvider {
    name: &'static str,
    accepts: TargetKind,
    answers: HashMap<String, Vec<String>>,
}

impl TableProvider {
    pub fn new(name: &'static str, accepts: TargetKind) -> Self {
        Self {
            name,
            accepts,
            answers: HashMap::new(),
        }
    }

    pub fn answer(mut self, target: &str, names: &[&str]) -> Self {
        self.answers
            .insert(target.to_string(), names.iter().map(|n| n.to_string()).collect());
        self
    }
}

#[async_trait]
impl DiscoveryProvider for TableProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn accepts(&self, target: TargetKind) -> bool {
        target == self.accepts
    }

    async fn discover(&self, target: &str) -> Result<BTreeSet<String>, ProviderError> {
        Ok(self.answers.get(target).into_iter().flatten().cloned().collect())
    }
}

/// Address history for hosts. Times out on the addresses in `failing`.
pub struct FlakyHistory {
    pub failing: Vec<IpAddr>,
}

#[async_trait]
impl EnumerationModule for FlakyHistory {
    fn name(&self) -> &'static str {
        "ip_history"
    }

    fn attribute(&self) -> Attribute {
        Attribute::IpHistory
    }

    fn applies_to(&self, kind: EntityKind) -> bool {
        kind == EntityKind::Host
    }

    async fn enumerate(&self, target: &str) -> Result<Enrichment, ModuleError> {
        if self.failing.iter().any(|ip| ip.to_string() == target) {
            return Err(ModuleError::new("ip_history", target, FailureKind::Timeout));
        }
        Ok(Enrichment::IpHistory(vec![IpHistoryEntry {
            ip: target.to_string(),
            location: None,
            owner: Some("ACME Corp".to_string()),
            last_seen: None,
        }]))
    }
}

/// Resolves names from a fixed table. Unknown names have no address.
#[derive(Default)]
pub struct TableResolver {
    addresses: HashMap<String, IpAddr>,
}

impl TableResolver {
    pub fn with(mut self, name: &str, ip: &str) -> Self {
        if let Ok(ip) = ip.parse() {
            self.addresses.insert(name.to_string(), ip);
        }
        self
    }
}

#[async_trait]
impl Resolver for TableResolver {
    async fn resolve(&self, name: &str) -> Result<Option<IpAddr>, ResolveError> {
        Ok(self.addresses.get(name).copied())
    }
}

/// The engagement used throughout the end-to-end tests.
///
/// * host `10.0.0.5` is seeded, `10.0.0.9` is not
/// * certificates of `example.com` name two subdomains and `example.org`
/// * reverse lookup of `10.0.0.5` yields `mail.example.com`
pub fn engagement_modules() -> Modules {
    let certificates = TableProvider::new("similar_certificate", TargetKind::Domain).answer(
        "example.com",
        &["www.example.com", "api.example.com", "example.org", "not a name"],
    );
    let reverse = TableProvider::new("reverse_ip", TargetKind::Ip).answer("10.0.0.5", &["mail.example.com"]);
    let history = FlakyHistory {
        failing: vec!["10.0.0.5".parse().unwrap()],
    };

    let providers: Vec<Arc<dyn DiscoveryProvider>> = vec![Arc::new(certificates), Arc::new(reverse)];
    let enumerators: Vec<Arc<dyn EnumerationModule>> = vec![Arc::new(history)];
    Modules { providers, enumerators }
}

pub fn engagement_resolver() -> Arc<dyn Resolver> {
    Arc::new(
        TableResolver::default()
            .with("www.example.com", "10.0.0.5")
            .with("api.example.com", "10.0.0.9"),
    )
}

/// Seed files on disk plus the config pointing at them.
pub struct Seeds {
    pub dir: tempfile::TempDir,
    pub cfg: RunConfig,
}

pub fn engagement_seeds() -> Seeds {
    let dir = tempfile::tempdir().unwrap();
    let ips: PathBuf = write_lines(&dir, "ips.txt", &["10.0.0.5"]);
    let domains: PathBuf = write_lines(&dir, "domains.txt", &["example.com", ""]);

    let mut cfg = RunConfig::new("acme");
    cfg.seeds.ips = Some(ips);
    cfg.seeds.domains = Some(domains);
    cfg.output_dir = dir.path().to_path_buf();
    Seeds { dir, cfg }
}

fn write_lines(dir: &tempfile::TempDir, file: &str, lines: &[&str]) -> PathBuf {
    let path: PathBuf = dir.path().join(file);
    let mut handle = std::fs::File::create(&path).unwrap();
    for line in lines {
        writeln!(handle, "{line}").unwrap();
    }
    path
}
