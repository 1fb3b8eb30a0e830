//! Several registries sharing storage and a notification channel.

use std::sync::Arc;
use std::time::Duration;

use sigil_core::KaiMoment;
use sigil_ledger::{
    FileStorage, LedgerBroadcast, LedgerEventKind, LedgerRegistry, LedgerStorage, MemoryStorage,
    NewLedgerEvent, Persistence, TokioBroadcast,
};

fn lock_event(ref_id: &str, pulse: u64) -> NewLedgerEvent {
    NewLedgerEvent {
        kind: LedgerEventKind::Lock,
        root_sigil_id: "root-shared".into(),
        root_svg_hash: "0f".repeat(32),
        kai_moment: KaiMoment::from_pulse(pulse),
        delta_phi_micro: "-250000".into(),
        resulting_balance_micro: "750000".into(),
        ref_id: ref_id.into(),
        refs: None,
        hashes: None,
    }
}

fn pair(
    storage: Arc<dyn LedgerStorage>,
) -> (LedgerRegistry, LedgerRegistry, Arc<dyn LedgerBroadcast>) {
    let channel: Arc<dyn LedgerBroadcast> = Arc::new(TokioBroadcast::new());
    (
        LedgerRegistry::new(storage.clone(), channel.clone()),
        LedgerRegistry::new(storage, channel.clone()),
        channel,
    )
}

#[test]
fn duplicate_records_from_two_contexts_converge_to_one() {
    let (a, b, _) = pair(Arc::new(MemoryStorage::new()));
    let first = a.record_event(lock_event("lock-1", 100)).unwrap();
    let second = b.record_event(lock_event("lock-1", 100)).unwrap();

    assert!(first.inserted);
    assert!(!second.inserted);
    assert_eq!(first.event.event_id, second.event.event_id);

    a.sync_from_storage();
    assert_eq!(a.snapshot(), b.snapshot());
    assert_eq!(a.snapshot().events.len(), 1);
}

#[test]
fn interleaved_records_converge_after_sync() {
    let (a, b, _) = pair(Arc::new(MemoryStorage::new()));
    a.record_event(lock_event("x", 30)).unwrap();
    b.record_event(lock_event("y", 10)).unwrap();
    a.record_event(lock_event("z", 20)).unwrap();
    b.sync_from_storage();

    let pulses: Vec<u64> = b
        .snapshot()
        .events
        .iter()
        .map(|e| e.kai_moment.pulse)
        .collect();
    assert_eq!(pulses, vec![10, 20, 30]);
    assert_eq!(a.snapshot(), b.snapshot());
}

#[test]
fn file_storage_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let storage: Arc<dyn LedgerStorage> = Arc::new(FileStorage::new(dir.path()));
    let (a, _, _) = pair(storage.clone());
    let recorded = a.record_event(lock_event("lock-1", 5)).unwrap();
    assert_eq!(recorded.persistence, Persistence::Persisted);
    drop(a);

    let (restarted, _, _) = pair(storage);
    assert_eq!(restarted.snapshot().events, vec![recorded.event]);
}

#[tokio::test]
async fn notification_triggers_sync_in_other_registry() {
    let (a, b, _) = pair(Arc::new(MemoryStorage::new()));
    let b = Arc::new(b);
    let task = b.spawn_sync();

    let recorded = a.record_event(lock_event("lock-9", 77)).unwrap();
    let mut synced = false;
    for _ in 0..100 {
        if b.latest_for_root("root-shared").as_ref() == Some(&recorded.event) {
            synced = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    task.abort();
    assert!(synced, "registry b never picked up the event");
}
