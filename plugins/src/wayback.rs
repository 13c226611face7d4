//! Wayback Machine CDX lookups.
//!
//! The CDX API answers with a JSON array of rows whose first row names the
//! columns. One query shape serves three plugins: archived hosts under a
//! domain, archived URLs under a subdomain and archived snapshots of one URL.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use scopr_common::error::{FailureKind, ModuleError, ProviderError};
use scopr_common::model::{Attribute, EntityKind, Enrichment};
use scopr_common::ports::{DiscoveryProvider, EnumerationModule, TargetKind};

use crate::http::{self, HttpClient};

const CDX_URL: &str = "https://web.archive.org/cdx/search/cdx";
const ARCHIVE_URL: &str = "https://web.archive.org/web";
const CDX_LIMIT: &str = "5000";

async fn cdx_rows(http: &HttpClient, pattern: &str, fields: &str) -> Result<Vec<Vec<String>>, FailureKind> {
    let url: Url = http::endpoint(
        CDX_URL,
        &[
            ("url", pattern),
            ("output", "json"),
            ("fl", fields),
            ("collapse", "urlkey"),
            ("limit", CDX_LIMIT),
        ],
    )?;
    let body: String = http.get_text(url).await?;
    parse_cdx(&body)
}

/// Drops the header row and keeps rows of strings.
fn parse_cdx(body: &str) -> Result<Vec<Vec<String>>, FailureKind> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let rows: Vec<Vec<Value>> = http::parse_json(body)?;
    Ok(rows
        .into_iter()
        .skip(1)
        .map(|row| {
            row.into_iter()
                .filter_map(|cell| cell.as_str().map(str::to_string))
                .collect()
        })
        .collect())
}

fn host_of(raw: &str) -> Option<String> {
    let with_scheme: String = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    Url::parse(&with_scheme)
        .ok()?
        .host_str()
        .map(|host| host.to_ascii_lowercase())
}

/// Hosts archived anywhere below a domain.
pub struct WaybackDomains {
    http: HttpClient,
}

impl WaybackDomains {
    pub const NAME: &'static str = "wayback_domains";

    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl DiscoveryProvider for WaybackDomains {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn accepts(&self, target: TargetKind) -> bool {
        target == TargetKind::Domain
    }

    async fn discover(&self, target: &str) -> Result<BTreeSet<String>, ProviderError> {
        let pattern: String = format!("*.{target}/*");
        let rows = cdx_rows(&self.http, &pattern, "original")
            .await
            .map_err(|kind| ProviderError::new(Self::NAME, target, kind))?;

        Ok(rows
            .iter()
            .filter_map(|row| row.first())
            .filter_map(|original| host_of(original))
            .collect())
    }
}

/// Archived URLs below one subdomain.
pub struct WaybackWebpages {
    http: HttpClient,
}

impl WaybackWebpages {
    pub const NAME: &'static str = "wayback_webpages";

    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl DiscoveryProvider for WaybackWebpages {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn accepts(&self, target: TargetKind) -> bool {
        target == TargetKind::Subdomain
    }

    async fn discover(&self, target: &str) -> Result<BTreeSet<String>, ProviderError> {
        let pattern: String = format!("{target}/*");
        let rows = cdx_rows(&self.http, &pattern, "original")
            .await
            .map_err(|kind| ProviderError::new(Self::NAME, target, kind))?;

        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .filter(|original| original.starts_with("http://") || original.starts_with("https://"))
            .collect())
    }
}

/// Snapshot links for one webpage URL.
pub struct WaybackUrls {
    http: HttpClient,
}

impl WaybackUrls {
    pub const NAME: &'static str = "wayback_urls";

    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl EnumerationModule for WaybackUrls {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn attribute(&self) -> Attribute {
        Attribute::ArchivedUrls
    }

    fn applies_to(&self, kind: EntityKind) -> bool {
        kind == EntityKind::Webpage
    }

    async fn enumerate(&self, target: &str) -> Result<Enrichment, ModuleError> {
        let rows = cdx_rows(&self.http, target, "timestamp,original")
            .await
            .map_err(|kind| ModuleError::new(Self::NAME, target, kind))?;
        Ok(Enrichment::ArchivedUrls(snapshot_links(rows)))
    }
}

fn snapshot_links(rows: Vec<Vec<String>>) -> Vec<String> {
    rows.into_iter()
        .filter_map(|row| match row.as_slice() {
            [timestamp, original, ..] => Some(format!("{ARCHIVE_URL}/{timestamp}/{original}")),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cdx_header_is_skipped() {
        let body = r#"[["original"],["http://www.example.com:80/"],["https://dev.example.com/login"]]"#;
        let rows = parse_cdx(body).unwrap();
        assert_eq!(rows.len(), 2);

        let hosts: BTreeSet<String> = rows.iter().filter_map(|r| host_of(&r[0])).collect();
        assert!(hosts.contains("www.example.com"));
        assert!(hosts.contains("dev.example.com"));
    }

    #[test]
    fn empty_body_means_no_rows() {
        assert!(parse_cdx("").unwrap().is_empty());
        assert!(parse_cdx("[]").unwrap().is_empty());
    }

    #[test]
    fn snapshot_links_are_built_from_timestamp_and_url() {
        let rows = vec![
            vec!["20200101000000".to_string(), "https://www.example.com/".to_string()],
            vec!["broken".to_string()],
        ];
        assert_eq!(
            snapshot_links(rows),
            vec!["https://web.archive.org/web/20200101000000/https://www.example.com/".to_string()]
        );
    }

    #[test]
    fn bare_hosts_are_parsed() {
        assert_eq!(host_of("Mail.Example.com/path"), Some("mail.example.com".to_string()));
    }
}
