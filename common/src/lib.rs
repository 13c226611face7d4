//! # Scopr Common
//!
//! Shared vocabulary for every `scopr` crate.
//!
//! * **[`model`]**: the scope graph entities (Scope, Host, Domain, SubDomain, Webpage).
//! * **[`name`]**: classification of raw discovery output into tagged names.
//! * **[`ports`]**: the traits behind which stores, providers and modules live.
//! * **[`config`]**: the immutable run configuration.
//! * **[`events`]**: structured record of what each engine did to each entity.

pub mod cancel;
pub mod config;
pub mod error;
pub mod events;
pub mod log;
pub mod model;
pub mod name;
pub mod ports;

#[doc(hidden)]
pub use tracing as __tracing;
