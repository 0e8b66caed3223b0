//! Concurrent handlers sharing one store.
//!
//! Operations are not transactional; these tests check that interleavings never
//! corrupt records, lose the canonical definition, or panic.

use std::sync::Arc;
use std::thread;

use glossary::{
    AuthorId, CanonicalTerm, InMemoryRecordStore, KnowledgeStore, RecordStore, Requester,
    StaticAdmins,
};

fn key(s: &str) -> CanonicalTerm {
    CanonicalTerm::new(s).unwrap()
}

fn shared() -> (Arc<InMemoryRecordStore>, Arc<KnowledgeStore>) {
    let records = Arc::new(InMemoryRecordStore::new());
    let store = KnowledgeStore::new(records.clone(), Arc::new(StaticAdmins::new(["root"])));
    (records, Arc::new(store))
}

#[test]
fn concurrent_lookups_count_every_hit() {
    let (records, store) = shared();
    store.remember("rust", "a systems language", &Requester::new("u")).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..100 {
                    assert!(store.lookup("rust").unwrap().found);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(records.get(&key("rust")).unwrap().unwrap().hits(), 800);
}

#[test]
fn concurrent_writers_leave_one_coherent_record() {
    let (records, store) = shared();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let root = Requester::new("root");
                for j in 0..50 {
                    store.remember("race", &format!("writer {i} pass {j}"), &root).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let record = records.get(&key("race")).unwrap().unwrap();
    assert!(record.definition_text().unwrap().starts_with("writer "));
    assert_eq!(record.author_id(), &AuthorId::new("root"));
    assert_eq!(records.len().unwrap(), 1);
}

#[test]
fn forgetting_while_resolving_aliases_never_panics() {
    let (records, store) = shared();
    let author = AuthorId::new("u");

    for round in 0..50 {
        records.put_definition(&key("target"), "here", &author).unwrap();
        for a in 0..4 {
            records
                .put_synonym(&key(&format!("alias{a}")), &key("target"), &author)
                .unwrap();
        }

        let readers: Vec<_> = (0..4)
            .map(|a| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let found = store.lookup(&format!("alias{a}")).unwrap();
                    if found.found {
                        assert_eq!(found.definition.as_deref(), Some("here"));
                    }
                })
            })
            .collect();
        let forgetter = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.forget("target", &Requester::new("root")).unwrap())
        };

        for r in readers {
            r.join().unwrap();
        }
        assert!(!forgetter.join().unwrap().denied, "round {round}");
    }

    // Whatever aliases survived now point nowhere and heal on the next lookup.
    for a in 0..4 {
        assert!(!store.lookup(&format!("alias{a}")).unwrap().found);
    }
    assert!(records.is_empty().unwrap());
}

#[test]
fn concurrent_synonyms_leave_one_alias_record() {
    let (records, store) = shared();
    let u = Requester::new("u");
    for t in ["left", "right"] {
        store.remember(t, t, &u).unwrap();
    }

    let handles: Vec<_> = ["left", "right", "left", "right"]
        .into_iter()
        .map(|target| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.synonym("middle", target, &Requester::new("u")).unwrap())
        })
        .collect();
    let created = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|o| o.created)
        .count();

    // Check and write are separate steps, so a late writer may still win.
    assert!(created >= 1);
    let middle = records.get(&key("middle")).unwrap().unwrap();
    assert!(middle.is_synonym());
    assert_eq!(records.len().unwrap(), 3);
}
