//! Wire-level protocol support for `scopr`.
//!
//! * **[`dns`]**: building A/PTR queries and reading answers.
//! * **[`resolver`]**: a small UDP stub resolver speaking to one nameserver.

pub mod dns;
pub mod resolver;

pub use resolver::DnsResolver;
