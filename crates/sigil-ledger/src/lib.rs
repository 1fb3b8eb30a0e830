//! # sigil-ledger: Local Ledger Registry
//!
//! Records value-moving events (deposits, withdrawals, locks, claims)
//! against root sigils. A [`LedgerRegistry`] is an explicit store object
//! with injected [`LedgerStorage`] and [`LedgerBroadcast`] backends; there
//! is no global state.
//!
//! ## Convergence
//!
//! Event ids are pure hashes of `(rootSigilId, kind, refId, pulse)`, and
//! [`merge_events`] only adds ids that are missing. Several registries on
//! one storage backend therefore converge to the same event set no matter
//! the order in which they record and sync.

pub mod broadcast;
pub mod error;
pub mod event;
pub mod registry;
pub mod storage;

pub use broadcast::{LedgerBroadcast, LedgerNotification, TokioBroadcast, LEDGER_CHANNEL_NAME};
pub use error::{LedgerError, StorageError};
pub use event::{
    derive_event_id, latest_event_for_root, merge_events, normalize_key, LedgerEvent,
    LedgerEventKind, LedgerHashes, LedgerRefs, NewLedgerEvent, EVENT_ID_DOMAIN,
};
pub use registry::{
    ClearOutcome, LedgerRegistry, LedgerSnapshot, Persistence, RecordOutcome, RootOutcome,
    RootRecord,
};
pub use storage::{FileStorage, LedgerStorage, MemoryStorage, LEDGER_STORAGE_KEY};
