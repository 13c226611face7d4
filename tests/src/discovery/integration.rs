#![cfg(test)]
use std::sync::Arc;

use scopr_common::cancel::StopSignal;
use scopr_common::error::ConfigError;
use scopr_common::events::{Component, Outcome};
use scopr_common::model::EntityKind;
use scopr_common::ports::ScopeStore;
use scopr_core::export::{DOMAINS_GROUP, HOSTS_GROUP, NodeKind, Report};
use scopr_core::{MemoryStore, Pipeline, RunOutcome};
use scopr_plugins::Modules;
use serde_json::Value;

use crate::support::{engagement_modules, engagement_resolver, engagement_seeds};

async fn run_once(store: Arc<MemoryStore>, cfg: &scopr_common::config::RunConfig) -> RunOutcome {
    let shared: Arc<dyn ScopeStore> = store;
    let mut pipeline = Pipeline::new(
        cfg,
        shared,
        engagement_modules(),
        engagement_resolver(),
        StopSignal::new(),
    );
    pipeline.run().await.unwrap()
}

/// Seeds, discovery, comparison and enumeration over one engagement.
#[tokio::test]
async fn full_run_builds_the_scope_tree() {
    let seeds = engagement_seeds();
    let outcome: RunOutcome = run_once(Arc::new(MemoryStore::new()), &seeds.cfg).await;

    assert!(!outcome.stopped);
    assert_eq!(outcome.seeds.hosts, 1);
    assert_eq!(outcome.seeds.domains, 1);
    assert_eq!(outcome.discovery.domains, 1, "example.org joins the scope");
    assert_eq!(outcome.discovery.subdomains, 3);
    assert_eq!(outcome.discovery.expanded, 3);

    assert_eq!(outcome.comparison.matched, vec!["www.example.com"]);
    assert_eq!(outcome.comparison.unmatched, vec!["api.example.com"]);
    assert_eq!(outcome.comparison.unresolved, vec!["mail.example.com"]);

    let hosts = outcome.tree.child(HOSTS_GROUP).unwrap();
    let host = hosts.child("10.0.0.5").unwrap();
    assert_eq!(host.children.len(), 1);
    assert_eq!(host.children[0].name, "www.example.com");
    assert_eq!(host.children[0].details["in_scope_ip"], Value::Bool(true));
    assert_eq!(host.details["ip_history"], Value::Null);

    let domains = outcome.tree.child(DOMAINS_GROUP).unwrap();
    let names: Vec<&str> = domains.children.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["example.com", "example.org"]);
}

#[tokio::test]
async fn failing_module_leaves_one_diagnostic() {
    let seeds = engagement_seeds();
    let outcome: RunOutcome = run_once(Arc::new(MemoryStore::new()), &seeds.cfg).await;

    assert_eq!(outcome.diagnostics.len(), 1, "{:?}", outcome.diagnostics);
    let event = &outcome.diagnostics[0];
    assert_eq!(event.component, Component::Enumeration);
    assert_eq!(event.entity, "host 10.0.0.5");
    assert!(event.outcome.is_failure());
    assert_eq!(outcome.enumeration.failed, 1);
}

#[tokio::test]
async fn rerun_from_snapshot_finds_nothing_new() {
    let seeds = engagement_seeds();
    let state = seeds.dir.path().join("state.json");

    let first = Arc::new(MemoryStore::new());
    run_once(Arc::clone(&first), &seeds.cfg).await;
    first.save(&state).unwrap();

    let resumed = Arc::new(MemoryStore::load(&state).unwrap());
    let second: RunOutcome = run_once(Arc::clone(&resumed), &seeds.cfg).await;

    assert_eq!(second.seeds.hosts, 0);
    assert_eq!(second.seeds.domains, 0);
    assert_eq!(second.discovery.domains, 0);
    assert_eq!(second.discovery.subdomains, 0);

    let subdomains = resumed.list("acme", EntityKind::SubDomain).await.unwrap();
    assert_eq!(subdomains.len(), 3);
    assert_eq!(second.tree.count(NodeKind::Subdomain), 1);
}

#[tokio::test]
async fn invalid_candidates_are_discarded_not_fatal() {
    let seeds = engagement_seeds();
    let shared: Arc<dyn ScopeStore> = Arc::new(MemoryStore::new());
    let mut pipeline = Pipeline::new(
        &seeds.cfg,
        shared,
        engagement_modules(),
        engagement_resolver(),
        StopSignal::new(),
    );
    let events = pipeline.events();
    pipeline.run().await.unwrap();

    let discarded: usize = events
        .events()
        .iter()
        .filter(|e| e.component == Component::Discovery && matches!(e.outcome, Outcome::Discarded(_)))
        .count();
    assert_eq!(discarded, 1);
}

#[tokio::test]
async fn report_lands_in_the_output_directory() {
    let seeds = engagement_seeds();
    let outcome: RunOutcome = run_once(Arc::new(MemoryStore::new()), &seeds.cfg).await;

    let report = Report::new(outcome.tree, outcome.diagnostics);
    let path = report.write(&seeds.cfg.output_dir).unwrap();

    assert!(path.starts_with(seeds.dir.path()));
    assert!(path.file_name().unwrap().to_string_lossy().starts_with("acme_"));

    let body: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(body["scope"], "acme");
    assert_eq!(body["tree"]["type"], "scope");
    assert_eq!(body["diagnostics"][0]["entity"], "host 10.0.0.5");
    assert_eq!(body["diagnostics"][0]["outcome"], "failed");
}

#[tokio::test]
async fn missing_seed_file_is_a_config_error() {
    let mut seeds = engagement_seeds();
    seeds.cfg.seeds.subdomains = Some(seeds.dir.path().join("absent.txt"));

    let shared: Arc<dyn ScopeStore> = Arc::new(MemoryStore::new());
    let mut pipeline = Pipeline::new(
        &seeds.cfg,
        shared,
        Modules::default(),
        engagement_resolver(),
        StopSignal::new(),
    );
    let err = pipeline.run().await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::SeedFile { .. })
    ));
}
