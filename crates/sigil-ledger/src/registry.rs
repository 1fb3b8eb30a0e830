//! # Ledger Registry
//!
//! Owns the in-memory root and event maps for one context (a process, a
//! CLI invocation). Every mutation first merges what is in storage, so
//! registries sharing a backend converge: event ids are pure and merging
//! only ever adds missing ids.
//!
//! Storage failures never surface as errors. They are logged at `warn` and
//! reported through [`Persistence::MemoryOnly`].

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::broadcast::{LedgerBroadcast, LedgerNotification};
use crate::error::{LedgerError, StorageError};
use crate::event::{latest_event_for_root, normalize_key, LedgerEvent, NewLedgerEvent};
use crate::storage::{LedgerStorage, LEDGER_STORAGE_KEY};

/// A root sigil known to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootRecord {
    pub root_sigil_id: String,
    pub root_svg_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_phi_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kai_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_pulse: Option<u64>,
}

/// Whether a mutation reached storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    Persisted,
    /// Kept in memory only; the reason is the storage error text.
    MemoryOnly(String),
    /// Nothing changed, so nothing was written.
    Unchanged,
}

impl Persistence {
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted | Self::Unchanged)
    }
}

#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub event: LedgerEvent,
    /// False when an event with the same id was already known.
    pub inserted: bool,
    pub persistence: Persistence,
}

#[derive(Debug, Clone)]
pub struct RootOutcome {
    pub root: RootRecord,
    pub persistence: Persistence,
}

#[derive(Debug, Clone)]
pub struct ClearOutcome {
    pub root_removed: bool,
    pub events_removed: usize,
    pub persistence: Persistence,
}

/// Point-in-time copy of the registry. Events are sorted by Kai moment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub roots: Vec<RootRecord>,
    pub events: Vec<LedgerEvent>,
}

#[derive(Debug, Default, Serialize)]
struct LedgerState {
    roots: BTreeMap<String, RootRecord>,
    events: BTreeMap<String, LedgerEvent>,
}

impl LedgerState {
    /// Add entries missing from `self`; returns the number of new events.
    fn absorb(&mut self, other: LedgerState) -> usize {
        for (key, root) in other.roots {
            self.roots.entry(key).or_insert(root);
        }
        let mut added = 0;
        for (key, event) in other.events {
            if let std::collections::btree_map::Entry::Vacant(slot) = self.events.entry(key) {
                slot.insert(event);
                added += 1;
            }
        }
        added
    }

    fn sorted_events(&self) -> Vec<LedgerEvent> {
        let mut events: Vec<LedgerEvent> = self.events.values().cloned().collect();
        events.sort_by_key(|e| e.kai_moment);
        events
    }
}

/// Copy a map key into `field` when the entry does not carry one.
fn with_fallback_id(mut value: Value, field: &str, key: &str) -> Value {
    if let Value::Object(obj) = &mut value {
        if !obj.get(field).is_some_and(Value::is_string) {
            obj.insert(field.to_string(), Value::String(key.to_string()));
        }
    }
    value
}

fn section(doc: &Value, name: &str) -> Map<String, Value> {
    match doc.get(name) {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

/// Parse a persisted document, skipping entries that do not parse.
fn parse_document(raw: &str) -> LedgerState {
    let doc: Value = match serde_json::from_str(raw) {
        Ok(doc @ Value::Object(_)) => doc,
        Ok(_) => {
            tracing::warn!("persisted ledger is not a JSON object, loading empty");
            return LedgerState::default();
        }
        Err(e) => {
            tracing::warn!(error = %e, "persisted ledger is unreadable, loading empty");
            return LedgerState::default();
        }
    };

    let mut state = LedgerState::default();
    let mut skipped = 0usize;
    for (key, value) in section(&doc, "roots") {
        match serde_json::from_value::<RootRecord>(with_fallback_id(value, "rootSigilId", &key)) {
            Ok(root) if !normalize_key(&root.root_sigil_id).is_empty() => {
                state.roots.insert(normalize_key(&root.root_sigil_id), root);
            }
            _ => skipped += 1,
        }
    }
    for (key, value) in section(&doc, "events") {
        match serde_json::from_value::<LedgerEvent>(with_fallback_id(value, "eventId", &key)) {
            Ok(event)
                if !normalize_key(&event.event_id).is_empty()
                    && event.kai_moment.validate().is_ok() =>
            {
                state.events.insert(normalize_key(&event.event_id), event);
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!(skipped, "skipped malformed ledger entries");
    }
    state
}

pub struct LedgerRegistry {
    storage: Arc<dyn LedgerStorage>,
    broadcast: Arc<dyn LedgerBroadcast>,
    state: RwLock<LedgerState>,
}

impl std::fmt::Debug for LedgerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("LedgerRegistry")
            .field("channel", &self.broadcast.channel_name())
            .field("roots", &state.roots.len())
            .field("events", &state.events.len())
            .finish()
    }
}

impl LedgerRegistry {
    /// Create a registry and load whatever the storage already holds.
    pub fn new(storage: Arc<dyn LedgerStorage>, broadcast: Arc<dyn LedgerBroadcast>) -> Self {
        let registry = Self {
            storage,
            broadcast,
            state: RwLock::new(LedgerState::default()),
        };
        registry.sync_from_storage();
        registry
    }

    fn load_stored(&self) -> LedgerState {
        match self.storage.load(LEDGER_STORAGE_KEY) {
            Ok(Some(raw)) => parse_document(&raw),
            Ok(None) => LedgerState::default(),
            Err(e) => {
                tracing::warn!(error = %e, "ledger storage unreadable, using memory only");
                LedgerState::default()
            }
        }
    }

    fn persist(&self, state: &LedgerState) -> Persistence {
        let written = serde_json::to_string(state)
            .map_err(StorageError::from)
            .and_then(|doc| self.storage.store(LEDGER_STORAGE_KEY, &doc));
        match written {
            Ok(()) => Persistence::Persisted,
            Err(e) => {
                tracing::warn!(error = %e, "ledger not persisted, keeping change in memory");
                Persistence::MemoryOnly(e.to_string())
            }
        }
    }

    /// Merge the stored document into memory; returns the number of
    /// events that were new to this registry.
    pub fn sync_from_storage(&self) -> usize {
        let stored = self.load_stored();
        self.state.write().absorb(stored)
    }

    /// Record a value movement. Recording the same `(root, kind, refId,
    /// pulse)` twice returns the first event with `inserted = false`.
    pub fn record_event(&self, new: NewLedgerEvent) -> Result<RecordOutcome, LedgerError> {
        let event = new.into_event()?;
        let key = normalize_key(&event.event_id);

        let stored = self.load_stored();
        let (event, persistence) = {
            let mut state = self.state.write();
            state.absorb(stored);
            if let Some(existing) = state.events.get(&key) {
                return Ok(RecordOutcome {
                    event: existing.clone(),
                    inserted: false,
                    persistence: Persistence::Unchanged,
                });
            }
            state.events.insert(key, event.clone());
            let persistence = self.persist(&state);
            (event, persistence)
        };

        tracing::info!(
            event_id = %event.event_id,
            kind = event.kind.as_str(),
            root = %event.root_sigil_id,
            pulse = event.kai_moment.pulse,
            "ledger event recorded"
        );
        self.broadcast.publish(LedgerNotification::Update {
            event_id: event.event_id.clone(),
        });
        Ok(RecordOutcome {
            event,
            inserted: true,
            persistence,
        })
    }

    /// Upsert a root. Optional fields missing from `entry` keep the values
    /// already on record. An empty id is ignored.
    pub fn record_root(&self, entry: RootRecord) -> Option<RootOutcome> {
        let key = normalize_key(&entry.root_sigil_id);
        if key.is_empty() {
            return None;
        }
        let stored = self.load_stored();
        let mut state = self.state.write();
        state.absorb(stored);
        let existing = state.roots.get(&key);
        let next = RootRecord {
            user_phi_key: entry
                .user_phi_key
                .or_else(|| existing.and_then(|r| r.user_phi_key.clone())),
            kai_signature: entry
                .kai_signature
                .or_else(|| existing.and_then(|r| r.kai_signature.clone())),
            last_seen_pulse: entry
                .last_seen_pulse
                .or_else(|| existing.and_then(|r| r.last_seen_pulse)),
            root_sigil_id: entry.root_sigil_id,
            root_svg_hash: entry.root_svg_hash,
        };
        let persistence = if existing == Some(&next) {
            Persistence::Unchanged
        } else {
            state.roots.insert(key, next.clone());
            self.persist(&state)
        };
        Some(RootOutcome {
            root: next,
            persistence,
        })
    }

    /// Remove a root and every event recorded against it.
    pub fn clear_root(&self, root_sigil_id: &str) -> ClearOutcome {
        let key = normalize_key(root_sigil_id);
        let stored = self.load_stored();
        let mut state = self.state.write();
        state.absorb(stored);
        let root_removed = state.roots.remove(&key).is_some();
        let before = state.events.len();
        state
            .events
            .retain(|_, e| normalize_key(&e.root_sigil_id) != key);
        let events_removed = before - state.events.len();
        let persistence = if root_removed || events_removed > 0 {
            self.persist(&state)
        } else {
            Persistence::Unchanged
        };
        ClearOutcome {
            root_removed,
            events_removed,
            persistence,
        }
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.state.read();
        LedgerSnapshot {
            roots: state.roots.values().cloned().collect(),
            events: state.sorted_events(),
        }
    }

    pub fn root(&self, root_sigil_id: &str) -> Option<RootRecord> {
        self.state
            .read()
            .roots
            .get(&normalize_key(root_sigil_id))
            .cloned()
    }

    /// Events for one root, oldest first.
    pub fn events_for_root(&self, root_sigil_id: &str) -> Vec<LedgerEvent> {
        let key = normalize_key(root_sigil_id);
        self.state
            .read()
            .sorted_events()
            .into_iter()
            .filter(|e| normalize_key(&e.root_sigil_id) == key)
            .collect()
    }

    pub fn latest_for_root(&self, root_sigil_id: &str) -> Option<LedgerEvent> {
        let state = self.state.read();
        latest_event_for_root(root_sigil_id, state.events.values()).cloned()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerNotification> {
        self.broadcast.subscribe()
    }

    /// Re-sync from storage whenever another registry announces a change.
    /// Runs until the channel closes; abort the handle to stop earlier.
    pub fn spawn_sync(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(LedgerNotification::Update { event_id }) => {
                        let added = registry.sync_from_storage();
                        tracing::debug!(%event_id, added, "ledger synced from storage");
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::debug!(missed, "ledger notifications lagged, resyncing");
                        registry.sync_from_storage();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::TokioBroadcast;
    use crate::event::fixtures::new_event;
    use crate::storage::MemoryStorage;

    fn registry_on(storage: Arc<dyn LedgerStorage>) -> LedgerRegistry {
        LedgerRegistry::new(storage, Arc::new(TokioBroadcast::new()))
    }

    fn root(id: &str) -> RootRecord {
        RootRecord {
            root_sigil_id: id.into(),
            root_svg_hash: "svg".into(),
            user_phi_key: None,
            kai_signature: None,
            last_seen_pulse: None,
        }
    }

    #[test]
    fn record_persists_and_broadcasts() {
        let storage = Arc::new(MemoryStorage::new());
        let registry = registry_on(storage.clone());
        let mut rx = registry.subscribe();

        let outcome = registry.record_event(new_event("root", "v1", 10)).unwrap();
        assert!(outcome.inserted);
        assert_eq!(outcome.persistence, Persistence::Persisted);
        assert_eq!(
            rx.try_recv().unwrap(),
            LedgerNotification::Update {
                event_id: outcome.event.event_id.clone()
            }
        );

        let raw = storage.load(LEDGER_STORAGE_KEY).unwrap().unwrap();
        let doc: Value = serde_json::from_str(&raw).unwrap();
        assert!(doc["events"][&outcome.event.event_id].is_object());
    }

    #[test]
    fn duplicate_record_returns_existing() {
        let registry = registry_on(Arc::new(MemoryStorage::new()));
        let first = registry.record_event(new_event("root", "v1", 10)).unwrap();
        let mut again = new_event("root", "v1", 10);
        again.delta_phi_micro = "5".into();
        let second = registry.record_event(again).unwrap();
        assert!(!second.inserted);
        assert_eq!(second.persistence, Persistence::Unchanged);
        assert_eq!(second.event, first.event);
        assert_eq!(registry.snapshot().events.len(), 1);
    }

    #[test]
    fn quota_failure_degrades_to_memory_only() {
        let registry = registry_on(Arc::new(MemoryStorage::with_quota(16)));
        let outcome = registry.record_event(new_event("root", "v1", 10)).unwrap();
        assert!(outcome.inserted);
        assert!(matches!(outcome.persistence, Persistence::MemoryOnly(ref r) if r.contains("quota")));
        assert!(!outcome.persistence.is_persisted());
        assert_eq!(registry.events_for_root("root"), vec![outcome.event]);
    }

    #[test]
    fn invalid_event_is_an_error() {
        let registry = registry_on(Arc::new(MemoryStorage::new()));
        let mut bad = new_event("root", "v1", 10);
        bad.resulting_balance_micro = "lots".into();
        assert!(matches!(
            registry.record_event(bad),
            Err(LedgerError::InvalidEvent(_))
        ));
    }

    #[test]
    fn record_root_merges_optional_fields() {
        let registry = registry_on(Arc::new(MemoryStorage::new()));
        let mut first = root("Root-1");
        first.user_phi_key = Some("phi".into());
        first.last_seen_pulse = Some(4);
        registry.record_root(first);

        let mut second = root("root-1");
        second.kai_signature = Some("sig".into());
        second.last_seen_pulse = Some(9);
        let outcome = registry.record_root(second).unwrap();
        assert_eq!(outcome.persistence, Persistence::Persisted);
        let merged = outcome.root;
        assert_eq!(merged.root_sigil_id, "root-1");
        assert_eq!(merged.user_phi_key.as_deref(), Some("phi"));
        assert_eq!(merged.kai_signature.as_deref(), Some("sig"));
        assert_eq!(merged.last_seen_pulse, Some(9));
        assert_eq!(registry.root(" ROOT-1 "), Some(merged));
    }

    #[test]
    fn record_root_reports_memory_only_on_quota() {
        let registry = registry_on(Arc::new(MemoryStorage::with_quota(16)));
        let outcome = registry.record_root(root("root-1")).unwrap();
        assert!(matches!(outcome.persistence, Persistence::MemoryOnly(ref r) if r.contains("quota")));
        assert_eq!(registry.root("root-1"), Some(outcome.root));
    }

    #[test]
    fn rerecording_same_root_is_unchanged() {
        let registry = registry_on(Arc::new(MemoryStorage::new()));
        registry.record_root(root("root-1")).unwrap();
        let again = registry.record_root(root("root-1")).unwrap();
        assert_eq!(again.persistence, Persistence::Unchanged);
    }

    #[test]
    fn inconsistent_moment_is_not_recorded() {
        let registry = registry_on(Arc::new(MemoryStorage::new()));
        let mut bad = new_event("root", "v1", 100);
        bad.kai_moment.step_index = 43;
        assert!(matches!(
            registry.record_event(bad),
            Err(LedgerError::InvalidEvent(_))
        ));
        assert!(registry.snapshot().events.is_empty());
    }

    #[test]
    fn empty_root_id_is_ignored() {
        let registry = registry_on(Arc::new(MemoryStorage::new()));
        assert!(registry.record_root(root("   ")).is_none());
        assert!(registry.snapshot().roots.is_empty());
    }

    #[test]
    fn clear_root_removes_root_and_events() {
        let storage = Arc::new(MemoryStorage::new());
        let registry = registry_on(storage.clone());
        registry.record_root(root("a"));
        registry.record_event(new_event("a", "1", 1)).unwrap();
        registry.record_event(new_event("a", "2", 2)).unwrap();
        registry.record_event(new_event("b", "3", 3)).unwrap();

        let cleared = registry.clear_root("A");
        assert!(cleared.root_removed);
        assert_eq!(cleared.events_removed, 2);
        assert_eq!(cleared.persistence, Persistence::Persisted);
        assert!(registry.events_for_root("a").is_empty());

        // A fresh registry on the same storage does not resurrect them.
        let reloaded = registry_on(storage);
        assert_eq!(reloaded.snapshot().events.len(), 1);
        assert_eq!(registry.clear_root("a").persistence, Persistence::Unchanged);
    }

    #[test]
    fn tolerant_loading_skips_bad_entries() {
        let storage = Arc::new(MemoryStorage::new());
        let good = new_event("root", "v1", 10).into_event().unwrap();
        let mut good_without_id = serde_json::to_value(&good).unwrap();
        good_without_id.as_object_mut().unwrap().remove("eventId");
        let mut skewed =
            serde_json::to_value(new_event("root", "v2", 10).into_event().unwrap()).unwrap();
        skewed["kaiMoment"]["stepIndex"] = serde_json::json!(40);
        let doc = serde_json::json!({
            "roots": {
                "r1": {"rootSvgHash": "svg"},
                "r2": {"rootSigilId": "r2"},
                "r3": 7
            },
            "events": {
                (good.event_id.clone()): good_without_id,
                "broken": {"eventId": "broken", "kind": "MINT"},
                "skewed": skewed,
            }
        });
        storage
            .store(LEDGER_STORAGE_KEY, &doc.to_string())
            .unwrap();

        let snap = registry_on(storage).snapshot();
        assert_eq!(snap.roots.len(), 1);
        assert_eq!(snap.roots[0].root_sigil_id, "r1");
        assert_eq!(snap.events, vec![good]);
    }

    #[test]
    fn unreadable_document_loads_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.store(LEDGER_STORAGE_KEY, "{not json").unwrap();
        let registry = registry_on(storage.clone());
        assert_eq!(registry.snapshot(), LedgerSnapshot::default());

        // The next write replaces the unreadable document.
        registry.record_event(new_event("root", "v1", 1)).unwrap();
        let raw = storage.load(LEDGER_STORAGE_KEY).unwrap().unwrap();
        assert!(serde_json::from_str::<Value>(&raw).is_ok());
    }

    #[test]
    fn latest_for_root_uses_moment_order() {
        let registry = registry_on(Arc::new(MemoryStorage::new()));
        registry.record_event(new_event("root", "late", 300)).unwrap();
        let early = registry.record_event(new_event("root", "early", 20)).unwrap();
        let latest = registry.latest_for_root("root").unwrap();
        assert_eq!(latest.kai_moment.pulse, 300);
        assert_eq!(registry.events_for_root("root")[0], early.event);
    }
}
