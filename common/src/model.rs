//! # Scope Model
//!
//! The entities of one engagement.
//!
//! ## Entities
//! * [`Scope`]: the engagement root, immutable once created.
//! * [`Host`]: an in-scope IP address plus the metadata attached to it.
//! * [`Domain`]: a registrable root domain.
//! * [`SubDomain`]: a name below an in-scope [`Domain`].
//! * [`Webpage`]: a URL found under a [`SubDomain`].
//!
//! Each entity is keyed by `(kind, scope, name)` and never deleted.

mod entity;
mod record;
mod update;

pub use entity::{Domain, Host, IpHistoryEntry, Scope, SubDomain, Webpage};
pub use record::{EntityKind, Record};
pub use update::{Attribute, Enrichment, FieldUpdate};
