//! # In-Memory Scope Store
//!
//! A [`ScopeStore`] backed by ordered maps behind a lock. Each map is keyed by
//! name inside its `(scope, kind)` partition, so listing is deterministic.
//!
//! The whole store can be written to and read back from a JSON snapshot; this
//! is how a run resumes where the previous one stopped.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use scopr_common::error::StoreError;
use scopr_common::model::{EntityKind, FieldUpdate, Record, Scope};
use scopr_common::ports::ScopeStore;

const SNAPSHOT_VERSION: u32 = 1;

type Partition = BTreeMap<String, Record>;

#[derive(Debug, Default)]
struct ScopeRecords {
    by_kind: BTreeMap<EntityKind, Partition>,
}

impl ScopeRecords {
    fn partition(&self, kind: EntityKind) -> Option<&Partition> {
        self.by_kind.get(&kind)
    }

    fn partition_mut(&mut self, kind: EntityKind) -> &mut Partition {
        self.by_kind.entry(kind).or_default()
    }
}

/// Serialised form of a [`MemoryStore`].
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub records: Vec<Record>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    scopes: RwLock<HashMap<String, ScopeRecords>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Result<Snapshot, StoreError> {
        let scopes = self.scopes.read().map_err(|_| StoreError::Poisoned)?;

        let mut names: Vec<&String> = scopes.keys().collect();
        names.sort();

        let records: Vec<Record> = names
            .into_iter()
            .filter_map(|name| scopes.get(name))
            .flat_map(|records| records.by_kind.values())
            .flat_map(|partition| partition.values().cloned())
            .collect();

        Ok(Snapshot {
            version: SNAPSHOT_VERSION,
            records,
        })
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, StoreError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::Snapshot(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }

        let mut scopes: HashMap<String, ScopeRecords> = HashMap::new();
        for record in snapshot.records {
            let scope: String = record.scope().to_string();
            scopes
                .entry(scope)
                .or_default()
                .partition_mut(record.kind())
                .insert(record.name(), record);
        }

        Ok(Self {
            scopes: RwLock::new(scopes),
        })
    }

    /// Loads a snapshot file. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let body: String = std::fs::read_to_string(path).map_err(|e| StoreError::Snapshot(e.to_string()))?;
        let snapshot: Snapshot = serde_json::from_str(&body).map_err(|e| StoreError::Snapshot(e.to_string()))?;
        Self::from_snapshot(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let snapshot: Snapshot = self.snapshot()?;
        let body: String =
            serde_json::to_string_pretty(&snapshot).map_err(|e| StoreError::Snapshot(e.to_string()))?;
        std::fs::write(path, body).map_err(|e| StoreError::Snapshot(e.to_string()))
    }
}

#[async_trait]
impl ScopeStore for MemoryStore {
    async fn create_scope(&self, scope: &str) -> Result<bool, StoreError> {
        let mut scopes = self.scopes.write().map_err(|_| StoreError::Poisoned)?;
        if scopes.contains_key(scope) {
            return Ok(false);
        }

        let mut records = ScopeRecords::default();
        let root = Record::Scope(Scope {
            name: scope.to_string(),
        });
        records.partition_mut(EntityKind::Scope).insert(scope.to_string(), root);
        scopes.insert(scope.to_string(), records);
        Ok(true)
    }

    async fn create_if_absent(&self, scope: &str, record: Record) -> Result<bool, StoreError> {
        if record.scope() != scope {
            return Err(StoreError::UnknownScope(record.scope().to_string()));
        }

        let mut scopes = self.scopes.write().map_err(|_| StoreError::Poisoned)?;
        let records: &mut ScopeRecords = scopes
            .get_mut(scope)
            .ok_or_else(|| StoreError::UnknownScope(scope.to_string()))?;

        let partition: &mut Partition = records.partition_mut(record.kind());
        let name: String = record.name();
        if partition.contains_key(&name) {
            return Ok(false);
        }
        partition.insert(name, record);
        Ok(true)
    }

    async fn get(&self, scope: &str, kind: EntityKind, name: &str) -> Result<Option<Record>, StoreError> {
        let scopes = self.scopes.read().map_err(|_| StoreError::Poisoned)?;
        let records: &ScopeRecords = scopes
            .get(scope)
            .ok_or_else(|| StoreError::UnknownScope(scope.to_string()))?;

        Ok(records.partition(kind).and_then(|p| p.get(name)).cloned())
    }

    async fn list(&self, scope: &str, kind: EntityKind) -> Result<Vec<Record>, StoreError> {
        let scopes = self.scopes.read().map_err(|_| StoreError::Poisoned)?;
        let records: &ScopeRecords = scopes
            .get(scope)
            .ok_or_else(|| StoreError::UnknownScope(scope.to_string()))?;

        Ok(records
            .partition(kind)
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn update_fields(
        &self,
        scope: &str,
        kind: EntityKind,
        name: &str,
        update: FieldUpdate,
    ) -> Result<(), StoreError> {
        let mut scopes = self.scopes.write().map_err(|_| StoreError::Poisoned)?;
        let records: &mut ScopeRecords = scopes
            .get_mut(scope)
            .ok_or_else(|| StoreError::UnknownScope(scope.to_string()))?;

        let record: &mut Record = records
            .partition_mut(kind)
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound {
                kind,
                name: name.to_string(),
            })?;
        update.apply(record)
    }
}
