//! # Run Events
//!
//! Every engine step is recorded as `(component, entity, outcome)`. Records are
//! kept for the end-of-run summary and mirrored to `tracing` with the same
//! fields, so nothing downstream needs to parse log strings.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Seeds,
    Discovery,
    Comparator,
    Enumeration,
    Export,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label: &str = match self {
            Component::Seeds => "seeds",
            Component::Discovery => "discovery",
            Component::Comparator => "comparator",
            Component::Enumeration => "enumeration",
            Component::Export => "export",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Inserted,
    AlreadyPresent,
    Updated,
    Discarded(String),
    Skipped(String),
    Failed(String),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Inserted => f.write_str("inserted"),
            Outcome::AlreadyPresent => f.write_str("already present"),
            Outcome::Updated => f.write_str("updated"),
            Outcome::Discarded(reason) => write!(f, "discarded ({reason})"),
            Outcome::Skipped(reason) => write!(f, "skipped ({reason})"),
            Outcome::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub component: Component,
    pub entity: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Shared, append-only event sink. Cloning shares the underlying log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, component: Component, entity: impl Into<String>, outcome: Outcome) {
        let event = Event {
            component,
            entity: entity.into(),
            outcome,
        };
        trace_event(&event);

        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// The failures recorded so far, in order.
    pub fn diagnostics(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|event| event.outcome.is_failure())
            .collect()
    }
}

fn trace_event(event: &Event) {
    let component: String = event.component.to_string();
    match &event.outcome {
        Outcome::Failed(reason) => tracing::warn!(
            component = %component,
            entity = %event.entity,
            outcome = "failed",
            "{}: {} failed: {}", component, event.entity, reason
        ),
        Outcome::Inserted => tracing::info!(
            target: crate::log::SUCCESS_TARGET,
            component = %component,
            entity = %event.entity,
            outcome = "inserted",
            "{}: new {}", component, event.entity
        ),
        other => tracing::debug!(
            component = %component,
            entity = %event.entity,
            outcome = %other,
            "{}: {} {}", component, event.entity, other
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_only_contain_failures() {
        let log = EventLog::new();
        log.record(Component::Discovery, "example.com", Outcome::Inserted);
        log.record(Component::Enumeration, "10.0.0.5", Outcome::Failed("ip_history: timed out".into()));
        log.record(Component::Discovery, "example.com", Outcome::AlreadyPresent);

        let diagnostics = log.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].entity, "10.0.0.5");
        assert_eq!(log.events().len(), 3);
    }

    #[test]
    fn clones_share_events() {
        let log = EventLog::new();
        let clone = log.clone();
        clone.record(Component::Seeds, "example.com", Outcome::Inserted);
        assert_eq!(log.events()[0].component, Component::Seeds);
        assert_eq!(log.events()[0].outcome, Outcome::Inserted);
    }
}
