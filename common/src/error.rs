//! # Error Taxonomy
//!
//! Only [`ConfigError`] ends a run. Everything else is caught where it happens,
//! turned into an [`crate::events::Event`] and the run carries on.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::EntityKind;

/// Fatal problems detected before discovery starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("engagement name must not be empty")]
    EmptyName,
    #[error("engagement name '{0}' contains whitespace or path separators")]
    InvalidName(String),
    #[error("unknown module '{0}'")]
    UnknownModule(String),
    #[error("invalid proxy '{url}': {reason}")]
    InvalidProxy { url: String, reason: String },
    #[error("cannot read seed file {}: {source}", path.display())]
    SeedFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("state file {}: {reason}", path.display())]
    StateFile { path: PathBuf, reason: String },
    #[error("cannot build http client: {0}")]
    HttpClient(String),
    #[error("cannot build tls client: {0}")]
    TlsClient(String),
}

/// Why a provider or module call produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureKind {
    #[error("network error: {0}")]
    Network(String),
    #[error("timed out")]
    Timeout,
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A discovery provider failed for one target. Its contribution becomes empty.
#[derive(Debug, Clone, Error)]
#[error("{provider} failed for {target}: {kind}")]
pub struct ProviderError {
    pub provider: String,
    pub target: String,
    pub kind: FailureKind,
}

impl ProviderError {
    pub fn new(provider: &str, target: &str, kind: FailureKind) -> Self {
        Self {
            provider: provider.to_string(),
            target: target.to_string(),
            kind,
        }
    }
}

/// An enumeration module failed for one entity. That attribute stays null.
#[derive(Debug, Clone, Error)]
#[error("{module} failed for {target}: {kind}")]
pub struct ModuleError {
    pub module: String,
    pub target: String,
    pub kind: FailureKind,
}

impl ModuleError {
    pub fn new(module: &str, target: &str, kind: FailureKind) -> Self {
        Self {
            module: module.to_string(),
            target: target.to_string(),
            kind,
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("dns i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("dns query timed out")]
    Timeout,
    #[error("malformed dns reply: {0}")]
    Malformed(String),
}

/// Store failures. An existing key on insertion is *not* one of them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("scope '{0}' does not exist")]
    UnknownScope(String),
    #[error("{kind} '{name}' does not exist")]
    NotFound { kind: EntityKind, name: String },
    #[error("field '{field}' does not apply to {kind}")]
    FieldMismatch { kind: EntityKind, field: &'static str },
    #[error("store lock poisoned")]
    Poisoned,
    #[error("snapshot: {0}")]
    Snapshot(String),
}
