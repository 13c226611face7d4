//! DNS-backed discovery providers.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::debug;

use scopr_common::error::{FailureKind, ProviderError, ResolveError};
use scopr_common::ports::{DiscoveryProvider, Resolver, TargetKind};
use scopr_protocols::DnsResolver;

const FUZZ_CONCURRENCY: usize = 20;

/// Common labels tried by [`FuzzDns`].
pub const DEFAULT_WORDLIST: &[&str] = &[
    "www", "api", "admin", "dev", "staging", "test", "qa", "uat",
    "mail", "smtp", "imap", "webmail", "autodiscover",
    "ftp", "sftp", "vpn", "remote", "portal", "intranet",
    "app", "m", "mobile", "cdn", "static", "assets",
    "git", "gitlab", "jenkins", "ci", "jira", "confluence", "wiki",
    "db", "backup", "old", "legacy", "beta", "demo",
    "sso", "auth", "login", "secure", "status", "monitor",
    "ns1", "ns2", "mx", "docs", "support", "shop",
];

fn resolve_failure(err: ResolveError) -> FailureKind {
    match err {
        ResolveError::Timeout => FailureKind::Timeout,
        ResolveError::Io(e) => FailureKind::Network(e.to_string()),
        ResolveError::Malformed(reason) => FailureKind::Malformed(reason),
    }
}

/// PTR names of an address.
pub struct ReverseDns {
    resolver: DnsResolver,
}

impl ReverseDns {
    pub const NAME: &'static str = "reverse_dns";

    pub fn new(resolver: DnsResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl DiscoveryProvider for ReverseDns {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn accepts(&self, target: TargetKind) -> bool {
        target == TargetKind::Ip
    }

    async fn discover(&self, target: &str) -> Result<BTreeSet<String>, ProviderError> {
        let ip: IpAddr = target.parse().map_err(|_| {
            ProviderError::new(Self::NAME, target, FailureKind::Malformed("not an ip address".into()))
        })?;
        let hostnames: Vec<String> = self
            .resolver
            .reverse(&ip)
            .await
            .map_err(|e| ProviderError::new(Self::NAME, target, resolve_failure(e)))?;
        Ok(hostnames.into_iter().collect())
    }
}

/// Brute forces `<word>.<domain>` and keeps the names that resolve.
pub struct FuzzDns {
    resolver: Arc<dyn Resolver>,
    wordlist: Vec<String>,
}

impl FuzzDns {
    pub const NAME: &'static str = "fuzz_dns";

    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self::with_wordlist(resolver, DEFAULT_WORDLIST.iter().map(|w| w.to_string()).collect())
    }

    pub fn with_wordlist(resolver: Arc<dyn Resolver>, wordlist: Vec<String>) -> Self {
        Self { resolver, wordlist }
    }
}

#[async_trait]
impl DiscoveryProvider for FuzzDns {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn accepts(&self, target: TargetKind) -> bool {
        target == TargetKind::Domain
    }

    async fn discover(&self, target: &str) -> Result<BTreeSet<String>, ProviderError> {
        let found: BTreeSet<String> = stream::iter(self.wordlist.iter().cloned())
            .map(|word: String| {
                let candidate: String = format!("{word}.{target}");
                let resolver = Arc::clone(&self.resolver);
                async move {
                    match resolver.resolve(&candidate).await {
                        Ok(Some(_)) => Some(candidate),
                        Ok(None) => None,
                        Err(e) => {
                            debug!("{candidate}: {e}");
                            None
                        }
                    }
                }
            })
            .buffer_unordered(FUZZ_CONCURRENCY)
            .filter_map(|found| async move { found })
            .collect()
            .await;

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    struct StaticResolver;

    #[async_trait]
    impl Resolver for StaticResolver {
        async fn resolve(&self, name: &str) -> Result<Option<IpAddr>, ResolveError> {
            match name {
                "www.example.com" | "vpn.example.com" => Ok(Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)))),
                "mail.example.com" => Err(ResolveError::Timeout),
                _ => Ok(None),
            }
        }
    }

    #[tokio::test]
    async fn fuzz_keeps_resolving_names() {
        let words = ["www", "vpn", "mail", "nothing"].iter().map(|w| w.to_string()).collect();
        let provider = FuzzDns::with_wordlist(Arc::new(StaticResolver), words);

        let found = provider.discover("example.com").await.unwrap();
        let expected: BTreeSet<String> =
            ["vpn.example.com", "www.example.com"].iter().map(|s| s.to_string()).collect();
        assert_eq!(found, expected);
    }

    #[tokio::test]
    async fn reverse_dns_rejects_names() {
        let provider = ReverseDns::new(DnsResolver::new(scopr_common::config::DEFAULT_NAMESERVER));
        let err = provider.discover("example.com").await.unwrap_err();
        assert!(matches!(err.kind, FailureKind::Malformed(_)));
    }
}
