//! # Export
//!
//! Turns the scope into a read-only tree for people:
//!
//! ```text
//! Scope
//! ├─ Hosts
//! │  └─ Host ── SubDomains resolving to it ── Webpages
//! └─ Domains
//!    └─ Domain
//! ```
//!
//! The tree is what the CLI prints and what the JSON report carries. It is a
//! view; nothing here writes to the store.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{Map, Value};

use scopr_common::error::StoreError;
use scopr_common::events::Event;
use scopr_common::model::{Domain, Host, SubDomain, Webpage};

use crate::repository::ScopeRepository;

pub const HOSTS_GROUP: &str = "Hosts";
pub const DOMAINS_GROUP: &str = "Domains";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Scope,
    Group,
    Host,
    Domain,
    Subdomain,
    Webpage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub children: Vec<Node>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

impl Node {
    fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            children: Vec::new(),
            details: Map::new(),
        }
    }

    fn detail(mut self, key: &str, value: Value) -> Self {
        if !value.is_null() {
            self.details.insert(key.to_string(), value);
        }
        self
    }

    fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Number of nodes of `kind` below (and including) this one.
    pub fn count(&self, kind: NodeKind) -> usize {
        let own: usize = usize::from(self.kind == kind);
        own + self.children.iter().map(|c| c.count(kind)).sum::<usize>()
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// The JSON artifact written at the end of a run.
#[derive(Debug, Serialize)]
pub struct Report {
    pub scope: String,
    pub generated_at: DateTime<Local>,
    pub tree: Node,
    pub diagnostics: Vec<Event>,
}

impl Report {
    pub fn new(tree: Node, diagnostics: Vec<Event>) -> Self {
        Self {
            scope: tree.name.clone(),
            generated_at: Local::now(),
            tree,
            diagnostics,
        }
    }

    /// `<output_dir>/<scope>_<timestamp>.json`
    pub fn path_in(&self, output_dir: &Path) -> PathBuf {
        let stamp: String = self.generated_at.format("%Y-%m-%d_%H-%M-%S").to_string();
        output_dir.join(format!("{}_{stamp}.json", self.scope))
    }

    pub fn write(&self, output_dir: &Path) -> anyhow::Result<PathBuf> {
        let path: PathBuf = self.path_in(output_dir);
        let body: String = serde_json::to_string_pretty(self).context("serialising report")?;
        std::fs::write(&path, body).with_context(|| format!("writing report to {}", path.display()))?;
        Ok(path)
    }
}

/// Builds the scope tree from the current store contents.
pub async fn build_tree(repo: &ScopeRepository) -> Result<Node, StoreError> {
    let hosts: Vec<Host> = repo.hosts().await?;
    let domains: Vec<Domain> = repo.domains().await?;
    let subdomains: Vec<SubDomain> = repo.subdomains().await?;
    let webpages: Vec<Webpage> = repo.webpages().await?;

    let host_nodes: Vec<Node> = hosts
        .iter()
        .map(|host| {
            let children: Vec<Node> = subdomains
                .iter()
                .filter(|sub| sub.ip == Some(host.address))
                .map(|sub| subdomain_node(sub, &webpages))
                .collect();
            host_node(host).with_children(children)
        })
        .collect();

    let domain_nodes: Vec<Node> = domains.iter().map(domain_node).collect();

    Ok(Node::new(repo.scope(), NodeKind::Scope).with_children(vec![
        Node::new(HOSTS_GROUP, NodeKind::Group).with_children(host_nodes),
        Node::new(DOMAINS_GROUP, NodeKind::Group).with_children(domain_nodes),
    ]))
}

fn host_node(host: &Host) -> Node {
    Node::new(host.address.to_string(), NodeKind::Host)
        .detail("whois", host.whois.clone().unwrap_or(Value::Null))
        .detail("shodan", host.shodan.clone().unwrap_or(Value::Null))
        .detail("ip_history", to_value(&host.ip_history))
}

fn domain_node(domain: &Domain) -> Node {
    Node::new(&domain.name, NodeKind::Domain)
        .detail("ip", to_value(&domain.ip))
        .detail("ip_history", to_value(&domain.ip_history))
}

fn subdomain_node(sub: &SubDomain, webpages: &[Webpage]) -> Node {
    let pages: Vec<Node> = webpages
        .iter()
        .filter(|page| page.subdomain == sub.name)
        .map(|page| {
            Node::new(&page.url, NodeKind::Webpage).detail("archived_urls", to_value(&page.archived_urls))
        })
        .collect();

    Node::new(&sub.name, NodeKind::Subdomain)
        .detail("ip", to_value(&sub.ip))
        .detail("in_scope_ip", Value::Bool(sub.in_scope_ip))
        .detail("ip_history", to_value(&sub.ip_history))
        .with_children(pages)
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use scopr_common::model::{EntityKind, FieldUpdate};
    use std::sync::Arc;

    async fn populated() -> ScopeRepository {
        let repo = ScopeRepository::new(Arc::new(MemoryStore::new()), "acme");
        repo.new_scope().await.unwrap();
        repo.new_host("10.0.0.5".parse().unwrap()).await.unwrap();
        repo.new_host("10.0.0.9".parse().unwrap()).await.unwrap();
        repo.new_subdomain("www.example.com", "example.com").await.unwrap();
        repo.new_subdomain("dev.example.com", "example.com").await.unwrap();
        repo.update(
            EntityKind::SubDomain,
            "www.example.com",
            FieldUpdate::ResolvedIp(Some("10.0.0.5".parse().unwrap())),
        )
        .await
        .unwrap();
        repo.new_webpage("https://www.example.com/login", "www.example.com")
            .await
            .unwrap();
        repo
    }

    #[tokio::test]
    async fn subdomains_hang_under_their_host() {
        let repo = populated().await;
        let tree = build_tree(&repo).await.unwrap();

        let hosts = tree.child(HOSTS_GROUP).unwrap();
        let linked = hosts.child("10.0.0.5").unwrap();
        assert_eq!(linked.children.len(), 1);
        assert_eq!(linked.children[0].name, "www.example.com");
        assert_eq!(linked.children[0].children[0].kind, NodeKind::Webpage);
        assert!(hosts.child("10.0.0.9").unwrap().children.is_empty());

        assert_eq!(tree.count(NodeKind::Domain), 1);
        assert_eq!(tree.count(NodeKind::Subdomain), 1);
    }

    #[tokio::test]
    async fn report_lands_in_the_output_dir() {
        let repo = populated().await;
        let tree = build_tree(&repo).await.unwrap();
        let dir = tempfile::tempdir().unwrap();

        let path = Report::new(tree, Vec::new()).write(dir.path()).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("acme_"));
        assert!(name.ends_with(".json"));

        let body: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(body["tree"]["type"], "scope");
        assert_eq!(body["tree"]["children"][0]["name"], HOSTS_GROUP);
    }
}
