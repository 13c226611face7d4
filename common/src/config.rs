//! # Run Configuration
//!
//! Everything a run needs to know, built once at start-up and handed to each
//! component at construction. Nothing here changes after the run begins.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_NAMESERVER: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)), 53);

const PROXY_SCHEMES: &[&str] = &["http", "https", "socks5", "socks5h"];

/// Credentials for the providers that require them.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub shodan: Option<String>,
    pub viewdns: Option<String>,
}

/// Line-delimited seed inputs. Every file is optional.
#[derive(Debug, Clone, Default)]
pub struct SeedFiles {
    pub ips: Option<PathBuf>,
    pub domains: Option<PathBuf>,
    pub subdomains: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Engagement name. Every entity of the run is stored under it.
    pub name: String,
    pub seeds: SeedFiles,
    /// Module names selected by the user. Empty means the default selection.
    pub modules: Vec<String>,
    /// Proxy for every HTTP-backed provider, e.g. `socks5://localhost:9080`.
    pub proxy: Option<String>,
    /// Ask before pulling a newly discovered root domain into scope.
    pub ask: bool,
    /// Snapshot of the store, loaded before and saved after the run.
    pub state_file: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub nameserver: SocketAddr,
    pub quiet: u8,
    pub api_keys: ApiKeys,
}

impl RunConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seeds: SeedFiles::default(),
            modules: Vec::new(),
            proxy: None,
            ask: false,
            state_file: None,
            output_dir: std::env::temp_dir(),
            nameserver: DEFAULT_NAMESERVER,
            quiet: 0,
            api_keys: ApiKeys::default(),
        }
    }

    /// Splits a comma separated module list, dropping empty entries.
    pub fn parse_modules(list: &str) -> Vec<String> {
        list.split(',')
            .map(|module| module.trim().to_ascii_lowercase())
            .filter(|module| !module.is_empty())
            .collect()
    }

    /// Rejects configurations that must stop the run before any discovery.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name: &str = self.name.trim();
        if name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if name.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\') {
            return Err(ConfigError::InvalidName(self.name.clone()));
        }

        if let Some(proxy) = &self.proxy {
            validate_proxy(proxy)?;
        }
        Ok(())
    }
}

fn validate_proxy(proxy: &str) -> Result<(), ConfigError> {
    let parsed: Url = Url::parse(proxy).map_err(|e| ConfigError::InvalidProxy {
        url: proxy.to_string(),
        reason: e.to_string(),
    })?;

    if !PROXY_SCHEMES.contains(&parsed.scheme()) {
        return Err(ConfigError::InvalidProxy {
            url: proxy.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    if parsed.host_str().is_none() {
        return Err(ConfigError::InvalidProxy {
            url: proxy.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_is_fatal() {
        let cfg = RunConfig::new("   ");
        assert!(matches!(cfg.validate(), Err(ConfigError::EmptyName)));
    }

    #[test]
    fn name_with_path_separator_is_rejected() {
        let cfg = RunConfig::new("acme/2024");
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidName(_))));
    }

    #[test]
    fn proxy_schemes() {
        let mut cfg = RunConfig::new("acme");
        cfg.proxy = Some("socks5://localhost:9080".into());
        assert!(cfg.validate().is_ok());

        cfg.proxy = Some("ftp://localhost:21".into());
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidProxy { .. })));

        cfg.proxy = Some("not a url".into());
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidProxy { .. })));
    }

    #[test]
    fn module_list_is_normalised() {
        let modules = RunConfig::parse_modules(" reverse_ip, ,Wayback_URLs,");
        assert_eq!(modules, vec!["reverse_ip", "wayback_urls"]);
    }
}
