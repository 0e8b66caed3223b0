//! Crash recovery tests for the on-disk store.
//!
//! These tests verify that the persistent backend correctly handles:
//! - Restarts (WAL replay, replay after compaction)
//! - Torn writes at the WAL tail
//! - A second process opening the same directory

#![cfg(feature = "persistent")]

use std::fs;
use std::sync::Arc;

use glossary::storage::persistent::WAL_FILE_NAME;
use glossary::storage::{open_database, PersistentConfig};
use glossary::{CanonicalTerm, KnowledgeStore, RecordStore, Requester, StaticAdmins};
use tempfile::tempdir;

fn key(s: &str) -> CanonicalTerm {
    CanonicalTerm::new(s).unwrap()
}

fn glossary_at(path: &std::path::Path) -> (Arc<glossary::PersistentRecordStore>, KnowledgeStore) {
    let records = Arc::new(open_database(path, None).unwrap());
    let store = KnowledgeStore::new(records.clone(), Arc::new(StaticAdmins::new(["root"])));
    (records, store)
}

/// Definitions, aliases, hits and deletions all survive a restart.
#[test]
fn test_state_survives_restart() {
    let dir = tempdir().unwrap();
    let u = Requester::new("alice");

    {
        let (_, store) = glossary_at(dir.path());
        store.remember("rust", "a systems language", &u).unwrap();
        store.remember("go", "another language", &u).unwrap();
        store.synonym("rust", "rustlang", &u).unwrap();
        store.lookup("rustlang").unwrap();
        store.lookup("rust").unwrap();
        store.forget("go", &Requester::new("root")).unwrap();
    }

    let (records, store) = glossary_at(dir.path());
    assert_eq!(records.len().unwrap(), 2);
    assert!(!records.exists(&key("go")).unwrap());
    assert_eq!(records.get(&key("rust")).unwrap().unwrap().hits(), 2);

    let info = store.info("rustlang").unwrap();
    assert!(info.is_alias);
    assert_eq!(info.hits, 1);
    assert_eq!(info.definition.as_deref(), Some("a systems language"));
}

/// Replaying the same WAL twice gives the same state.
#[test]
fn test_wal_replay_idempotency() {
    let dir = tempdir().unwrap();
    {
        let (_, store) = glossary_at(dir.path());
        store.remember("trait", "shared behavior", &Requester::new("u")).unwrap();
        for _ in 0..3 {
            store.lookup("trait").unwrap();
        }
    }

    for _ in 0..2 {
        let (records, _) = glossary_at(dir.path());
        assert_eq!(records.get(&key("trait")).unwrap().unwrap().hits(), 3);
    }
}

/// A torn final entry is dropped and the store keeps working.
#[test]
fn test_torn_wal_tail_is_discarded() {
    let dir = tempdir().unwrap();
    let wal_path = dir.path().join(WAL_FILE_NAME);
    {
        let (_, store) = glossary_at(dir.path());
        for i in 0..5 {
            store
                .remember(&format!("term{i}"), "defined", &Requester::new("u"))
                .unwrap();
        }
    }

    // Cut a few bytes off the last frame, as a crash mid-append would.
    let file = fs::OpenOptions::new().write(true).open(&wal_path).unwrap();
    let size = file.metadata().unwrap().len();
    file.set_len(size - 3).unwrap();
    drop(file);

    let (records, store) = glossary_at(dir.path());
    assert_eq!(records.len().unwrap(), 4);
    assert!(!records.exists(&key("term4")).unwrap());

    store.remember("term4", "again", &Requester::new("u")).unwrap();
    drop(store);
    drop(records);

    let (records, _) = glossary_at(dir.path());
    assert_eq!(records.len().unwrap(), 5);
}

/// Compaction folds the WAL into a segment that reopens identically.
#[test]
fn test_compaction_then_restart() {
    let dir = tempdir().unwrap();
    {
        let (records, store) = glossary_at(dir.path());
        store.remember("a", "first", &Requester::new("u")).unwrap();
        store.synonym("b", "a", &Requester::new("u")).unwrap();
        store.lookup("b").unwrap();

        let result = records.compact().unwrap();
        assert_eq!(result.records_compacted, 2);
        assert!(result.wal_size_after < result.wal_size_before);

        // Written after the snapshot; must come back from the WAL.
        store.remember("c", "third", &Requester::new("u")).unwrap();
    }

    let (records, store) = glossary_at(dir.path());
    assert_eq!(records.len().unwrap(), 3);
    assert_eq!(store.lookup("b").unwrap().definition.as_deref(), Some("first"));
    assert_eq!(records.get(&key("a")).unwrap().unwrap().hits(), 2);
}

/// A small WAL limit triggers compaction on its own without losing writes.
#[test]
fn test_auto_compaction_under_load() {
    let dir = tempdir().unwrap();
    let config = PersistentConfig {
        max_wal_size: 4096,
        ..PersistentConfig::default()
    };
    {
        let records = Arc::new(open_database(dir.path(), Some(config.clone())).unwrap());
        let store = KnowledgeStore::new(records.clone(), Arc::new(StaticAdmins::default()));
        for i in 0..200 {
            store
                .remember(
                    &format!("term{i:03}"),
                    "a reasonably long definition text",
                    &Requester::new("u"),
                )
                .unwrap();
        }
        assert!(records.wal_size() <= 4096 + 512);
    }

    let records = open_database(dir.path(), Some(config)).unwrap();
    assert_eq!(records.len().unwrap(), 200);
}

/// Only one process may hold a data directory.
#[test]
fn test_second_open_is_refused() {
    let dir = tempdir().unwrap();
    let first = open_database(dir.path(), None).unwrap();

    match open_database(dir.path(), None) {
        Err(err) => assert!(err.is_store_unavailable()),
        Ok(_) => panic!("directory should be locked"),
    }

    drop(first);
    assert!(open_database(dir.path(), None).is_ok());
}
