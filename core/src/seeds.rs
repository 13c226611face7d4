//! # Seed Loader
//!
//! Reads the operator's line-delimited seed files into the scope.
//!
//! * **IPs**: every line must be an address; each becomes a Host.
//! * **Domains**: every line is taken as a root domain, even when the suffix
//!   heuristic would call it a subdomain. This is how an operator declares
//!   apexes like `corp.example.co.uk`.
//! * **Subdomains**: every line must classify as a subdomain; its apex is
//!   created alongside it.
//!
//! Domains are loaded before subdomains so declared apexes take precedence.
//! Lines of the wrong shape are recorded and skipped. A file that cannot be read
//! stops the run before discovery.

use std::collections::BTreeSet;
use std::path::Path;

use scopr_common::config::SeedFiles;
use scopr_common::error::{ConfigError, StoreError};
use scopr_common::events::{Component, EventLog, Outcome};
use scopr_common::name::{self, Classified};

use crate::repository::{ScopeRepository, SubdomainInsert};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub hosts: usize,
    pub domains: usize,
    pub subdomains: usize,
    pub skipped: usize,
}

/// Splits a seed file into names. Trailing whitespace is dropped, blank lines ignored.
pub fn parse_lines(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

async fn read_lines(path: &Path) -> Result<Vec<String>, ConfigError> {
    let body: String = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::SeedFile {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(parse_lines(&body))
}

/// Loads every configured seed file into `repo`.
///
/// All files are read before anything is inserted, so an unreadable file leaves
/// the scope untouched.
pub async fn load_seeds(
    repo: &ScopeRepository,
    files: &SeedFiles,
    events: &EventLog,
) -> Result<SeedSummary, ConfigError> {
    let ips: Vec<String> = match &files.ips {
        Some(path) => read_lines(path).await?,
        None => Vec::new(),
    };
    let domains: Vec<String> = match &files.domains {
        Some(path) => read_lines(path).await?,
        None => Vec::new(),
    };
    let subdomains: Vec<String> = match &files.subdomains {
        Some(path) => read_lines(path).await?,
        None => Vec::new(),
    };

    let mut summary = SeedSummary::default();
    let no_apexes: BTreeSet<String> = BTreeSet::new();

    for line in &ips {
        match name::classify(line, &no_apexes) {
            Classified::Ip(ip) => {
                let created = repo.new_host(ip).await;
                if tally(events, format!("host {ip}"), created) {
                    summary.hosts += 1;
                }
            }
            other => skip(events, line, &other, "an ip address", &mut summary),
        }
    }

    for line in &domains {
        match name::classify(line, &no_apexes) {
            Classified::Domain(domain) | Classified::Subdomain { name: domain, .. } => {
                let created = repo.new_domain(&domain).await;
                if tally(events, format!("domain {domain}"), created) {
                    summary.domains += 1;
                }
            }
            other => skip(events, line, &other, "a domain", &mut summary),
        }
    }

    let known_apexes: BTreeSet<String> = repo.apexes().await.unwrap_or_default();
    for line in &subdomains {
        match name::classify(line, &known_apexes) {
            Classified::Subdomain { name: sub, apex } => {
                let created: Result<bool, StoreError> = repo
                    .new_subdomain(&sub, &apex)
                    .await
                    .map(|insert: SubdomainInsert| {
                        if insert.domain_created {
                            events.record(Component::Seeds, format!("domain {apex}"), Outcome::Inserted);
                        }
                        insert.subdomain_created
                    });
                if tally(events, format!("subdomain {sub}"), created) {
                    summary.subdomains += 1;
                }
            }
            other => skip(events, line, &other, "a subdomain", &mut summary),
        }
    }

    Ok(summary)
}

/// Records an insertion result. Returns whether the entity is new.
fn tally(events: &EventLog, entity: String, created: Result<bool, StoreError>) -> bool {
    match created {
        Ok(true) => {
            events.record(Component::Seeds, entity, Outcome::Inserted);
            true
        }
        Ok(false) => {
            events.record(Component::Seeds, entity, Outcome::AlreadyPresent);
            false
        }
        Err(e) => {
            events.record(Component::Seeds, entity, Outcome::Failed(e.to_string()));
            false
        }
    }
}

fn skip(events: &EventLog, line: &str, found: &Classified, expected: &str, summary: &mut SeedSummary) {
    let reason: String = match found {
        Classified::Invalid { reason, .. } => (*reason).to_string(),
        other => format!("expected {expected}, found {}", other.label()),
    };
    events.record(Component::Seeds, format!("seed {line}"), Outcome::Discarded(reason));
    summary.skipped += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn seed_file(lines: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(lines.as_bytes()).unwrap();
        file
    }

    async fn repository() -> ScopeRepository {
        let repo = ScopeRepository::new(Arc::new(MemoryStore::new()), "acme");
        repo.new_scope().await.unwrap();
        repo
    }

    #[test]
    fn blank_lines_and_trailing_space_are_dropped() {
        let lines = parse_lines("example.com  \n\n   \nexample.org\r\n");
        assert_eq!(lines, vec!["example.com", "example.org"]);
    }

    #[tokio::test]
    async fn every_kind_is_loaded() {
        let repo = repository().await;
        let ips = seed_file("10.0.0.5\nexample.com\n10.0.0.5\n");
        let domains = seed_file("example.com\ncorp.example.co.uk\n");
        let subs = seed_file("www.example.com\napi.corp.example.co.uk\nexample.com\nmail.other.net\n");
        let files = SeedFiles {
            ips: Some(ips.path().to_path_buf()),
            domains: Some(domains.path().to_path_buf()),
            subdomains: Some(subs.path().to_path_buf()),
        };
        let events = EventLog::new();

        let summary = load_seeds(&repo, &files, &events).await.unwrap();

        assert_eq!(
            summary,
            SeedSummary {
                hosts: 1,
                domains: 2,
                subdomains: 3,
                skipped: 2
            }
        );
        let subs = repo.subdomains().await.unwrap();
        let api = subs.iter().find(|s| s.name == "api.corp.example.co.uk").unwrap();
        assert_eq!(api.domain, "corp.example.co.uk");
        assert!(repo.apexes().await.unwrap().contains("other.net"));
        assert!(events.diagnostics().is_empty());
    }

    #[tokio::test]
    async fn unreadable_file_is_fatal() {
        let repo = repository().await;
        let files = SeedFiles {
            ips: None,
            domains: Some(PathBuf::from("/nonexistent/scopr/domains.txt")),
            subdomains: None,
        };

        let result = load_seeds(&repo, &files, &EventLog::new()).await;

        assert!(matches!(result, Err(ConfigError::SeedFile { .. })));
        assert!(repo.apexes().await.unwrap().is_empty());
    }
}
