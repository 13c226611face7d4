//! # Scopr Core
//!
//! The engines behind a run, written against the ports in `scopr-common`.
//!
//! * **[`store`]**: in-memory scope store with JSON snapshots.
//! * **[`discovery`]**: fixed-point scope expansion.
//! * **[`enumeration`]**: per-entity annotation.
//! * **[`comparator`]**: subdomain to host address matching.
//! * **[`pipeline`]**: the phases of one run, in order.

pub mod comparator;
pub mod discovery;
pub mod enumeration;
pub mod export;
pub mod pipeline;
pub mod repository;
pub mod seeds;
pub mod store;

pub use pipeline::{Phase, Pipeline, RunOutcome};
pub use store::MemoryStore;
