//! # Scopr Plugins
//!
//! Concrete discovery providers and enumeration modules.
//!
//! Every plugin implements one of the ports from [`scopr_common::ports`] and is
//! picked by name through the [`registry`]. HTTP-backed plugins share one
//! [`http::HttpClient`], which carries the run's proxy.
//!
//! ## Discovery providers
//! * [`crtsh::SimilarCertificate`]: names sharing certificates with the target.
//! * [`tls::ReadCertificate`]: names in the certificate the target serves.
//! * [`wayback::WaybackDomains`]: hosts archived under the target.
//! * [`wayback::WaybackWebpages`]: URLs archived under a subdomain.
//! * [`hackertarget::ReverseIp`]: names hosted on an address.
//! * [`shodan::ShodanDomain`]: subdomains known to Shodan.
//! * [`dns::ReverseDns`]: PTR records of an address.
//! * [`dns::FuzzDns`]: wordlist brute force.
//!
//! ## Enumeration modules
//! * [`shodan::ShodanHost`], [`rdap::WhoisIp`], [`viewdns::IpHistory`], [`wayback::WaybackUrls`].

pub mod crtsh;
pub mod dns;
pub mod hackertarget;
pub mod http;
pub mod rdap;
pub mod registry;
pub mod shodan;
pub mod tls;
pub mod viewdns;
pub mod wayback;

pub use registry::{Modules, build_modules};
