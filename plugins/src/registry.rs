//! # Module Registry
//!
//! Turns the module names of a [`RunConfig`] into live plugin instances.
//!
//! With no explicit selection the run uses the same providers and modules the
//! tool has always defaulted to. Names are validated before anything is built,
//! so a typo stops the run before discovery starts.

use std::sync::Arc;

use scopr_common::config::RunConfig;
use scopr_common::error::ConfigError;
use scopr_common::ports::{DiscoveryProvider, EnumerationModule, Resolver};
use scopr_common::warn;
use scopr_protocols::DnsResolver;

use crate::crtsh::SimilarCertificate;
use crate::dns::{FuzzDns, ReverseDns};
use crate::hackertarget::ReverseIp;
use crate::http::HttpClient;
use crate::rdap::WhoisIp;
use crate::shodan::{ShodanDomain, ShodanHost};
use crate::tls::ReadCertificate;
use crate::viewdns::IpHistory;
use crate::wayback::{WaybackDomains, WaybackUrls, WaybackWebpages};

pub const DISCOVERY_MODULES: &[&str] = &[
    ReverseIp::NAME,
    ShodanDomain::NAME,
    SimilarCertificate::NAME,
    ReadCertificate::NAME,
    WaybackDomains::NAME,
    WaybackWebpages::NAME,
    ReverseDns::NAME,
    FuzzDns::NAME,
];

pub const ENUMERATION_MODULES: &[&str] = &[
    IpHistory::NAME,
    WaybackUrls::NAME,
    ShodanHost::NAME,
    WhoisIp::NAME,
];

pub const DEFAULT_DISCOVERY: &[&str] = &[
    ReverseIp::NAME,
    ShodanDomain::NAME,
    SimilarCertificate::NAME,
    ReadCertificate::NAME,
    WaybackDomains::NAME,
];

pub const DEFAULT_ENUMERATION: &[&str] = &[
    IpHistory::NAME,
    WaybackUrls::NAME,
    ShodanHost::NAME,
    WhoisIp::NAME,
];

/// The module names of one run, split by role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub discovery: Vec<String>,
    pub enumeration: Vec<String>,
}

/// Validates and splits user-selected module names.
pub fn select(names: &[String]) -> Result<Selection, ConfigError> {
    if names.is_empty() {
        return Ok(Selection {
            discovery: DEFAULT_DISCOVERY.iter().map(|n| n.to_string()).collect(),
            enumeration: DEFAULT_ENUMERATION.iter().map(|n| n.to_string()).collect(),
        });
    }

    let mut selection = Selection {
        discovery: Vec::new(),
        enumeration: Vec::new(),
    };
    for name in names {
        let bucket: &mut Vec<String> = if DISCOVERY_MODULES.contains(&name.as_str()) {
            &mut selection.discovery
        } else if ENUMERATION_MODULES.contains(&name.as_str()) {
            &mut selection.enumeration
        } else {
            return Err(ConfigError::UnknownModule(name.clone()));
        };
        if !bucket.contains(name) {
            bucket.push(name.clone());
        }
    }
    Ok(selection)
}

/// Live plugins for a run.
#[derive(Clone, Default)]
pub struct Modules {
    pub providers: Vec<Arc<dyn DiscoveryProvider>>,
    pub enumerators: Vec<Arc<dyn EnumerationModule>>,
}

impl Modules {
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn enumerator_names(&self) -> Vec<&'static str> {
        self.enumerators.iter().map(|m| m.name()).collect()
    }
}

/// Builds every selected plugin. Plugins missing an API key are skipped with a warning.
pub fn build_modules(cfg: &RunConfig, resolver: DnsResolver) -> Result<Modules, ConfigError> {
    let selection: Selection = select(&cfg.modules)?;
    let http: HttpClient = HttpClient::new(cfg.proxy.as_deref())?;
    let shared_resolver: Arc<dyn Resolver> = Arc::new(resolver.clone());

    let mut modules = Modules::default();

    for name in &selection.discovery {
        let provider: Option<Arc<dyn DiscoveryProvider>> = match name.as_str() {
            ReverseIp::NAME => Some(Arc::new(ReverseIp::new(http.clone()))),
            SimilarCertificate::NAME => Some(Arc::new(SimilarCertificate::new(http.clone()))),
            ReadCertificate::NAME => Some(Arc::new(ReadCertificate::new()?)),
            WaybackDomains::NAME => Some(Arc::new(WaybackDomains::new(http.clone()))),
            WaybackWebpages::NAME => Some(Arc::new(WaybackWebpages::new(http.clone()))),
            ReverseDns::NAME => Some(Arc::new(ReverseDns::new(resolver.clone()))),
            FuzzDns::NAME => Some(Arc::new(FuzzDns::new(Arc::clone(&shared_resolver)))),
            ShodanDomain::NAME => cfg
                .api_keys
                .shodan
                .clone()
                .map(|key| Arc::new(ShodanDomain::new(http.clone(), key)) as Arc<dyn DiscoveryProvider>),
            _ => return Err(ConfigError::UnknownModule(name.clone())),
        };
        match provider {
            Some(provider) => modules.providers.push(provider),
            None => warn!("{name} skipped: no api key configured"),
        }
    }

    for name in &selection.enumeration {
        let module: Option<Arc<dyn EnumerationModule>> = match name.as_str() {
            WaybackUrls::NAME => Some(Arc::new(WaybackUrls::new(http.clone()))),
            WhoisIp::NAME => Some(Arc::new(WhoisIp::new(http.clone()))),
            ShodanHost::NAME => cfg
                .api_keys
                .shodan
                .clone()
                .map(|key| Arc::new(ShodanHost::new(http.clone(), key)) as Arc<dyn EnumerationModule>),
            IpHistory::NAME => cfg
                .api_keys
                .viewdns
                .clone()
                .map(|key| Arc::new(IpHistory::new(http.clone(), key)) as Arc<dyn EnumerationModule>),
            _ => return Err(ConfigError::UnknownModule(name.clone())),
        };
        match module {
            Some(module) => modules.enumerators.push(module),
            None => warn!("{name} skipped: no api key configured"),
        }
    }

    Ok(modules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scopr_common::config::ApiKeys;

    #[test]
    fn defaults_when_nothing_selected() {
        let selection = select(&[]).unwrap();
        assert_eq!(selection.discovery, DEFAULT_DISCOVERY);
        assert_eq!(selection.enumeration, DEFAULT_ENUMERATION);
    }

    #[test]
    fn names_are_split_by_role() {
        let names = RunConfig::parse_modules("reverse_ip,wayback_urls,fuzz_dns,reverse_ip");
        let selection = select(&names).unwrap();
        assert_eq!(selection.discovery, vec!["reverse_ip", "fuzz_dns"]);
        assert_eq!(selection.enumeration, vec!["wayback_urls"]);
    }

    #[test]
    fn unknown_module_is_fatal() {
        let names = vec!["gowitness".to_string()];
        assert!(matches!(select(&names), Err(ConfigError::UnknownModule(name)) if name == "gowitness"));
    }

    #[test]
    fn keyless_plugins_are_skipped() {
        let mut cfg = RunConfig::new("acme");
        cfg.api_keys = ApiKeys::default();
        let modules = build_modules(&cfg, DnsResolver::new(cfg.nameserver)).unwrap();

        assert_eq!(
            modules.provider_names(),
            vec![ReverseIp::NAME, SimilarCertificate::NAME, ReadCertificate::NAME, WaybackDomains::NAME]
        );
        assert_eq!(modules.enumerator_names(), vec![WaybackUrls::NAME, WhoisIp::NAME]);
    }

    #[test]
    fn keyed_plugins_are_built() {
        let mut cfg = RunConfig::new("acme");
        cfg.api_keys = ApiKeys {
            shodan: Some("s".into()),
            viewdns: Some("v".into()),
        };
        let modules = build_modules(&cfg, DnsResolver::new(cfg.nameserver)).unwrap();
        assert_eq!(modules.providers.len(), DEFAULT_DISCOVERY.len());
        assert_eq!(modules.enumerators.len(), DEFAULT_ENUMERATION.len());
    }
}
