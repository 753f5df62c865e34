//! Handoffs across real threads

use crate::common::{seeded, user};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use vessel::{Capsule, Connection, Error, Key, Record, ResultSet, Row, SharedCapsule, Value};

static_assertions::assert_impl_all!(Capsule<Record>: Send);
static_assertions::assert_impl_all!(Capsule<ResultSet>: Send);
static_assertions::assert_impl_all!(SharedCapsule<Record>: Send, Sync, Clone);
static_assertions::assert_not_impl_any!(Record: Send, Sync);
static_assertions::assert_not_impl_any!(ResultSet: Send, Sync);
static_assertions::assert_not_impl_any!(Connection: Send, Sync);

#[test]
fn record_handoff_over_channel() {
    let (db, source) = seeded(3);
    let (tx, rx) = mpsc::channel::<Capsule<Record>>();

    let worker_db = Arc::clone(&db);
    let worker = thread::spawn(move || {
        let conn = worker_db.connect();
        let capsule = rx.recv().unwrap();
        let record = conn.resolve(capsule).unwrap().unwrap();
        (record.key().clone(), record.get("name").unwrap())
    });

    let record = source.find("users", "2").unwrap().unwrap();
    tx.send(Capsule::new(&record).unwrap()).unwrap();

    let (key, name) = worker.join().unwrap();
    assert_eq!(key, user("2"));
    assert_eq!(name, Some(Value::from("user-2")));
    assert!(!source.is_pinned());
}

#[test]
fn result_set_handoff_over_channel() {
    let (db, source) = seeded(4);
    let (tx, rx) = mpsc::channel::<Capsule<ResultSet>>();

    let worker_db = Arc::clone(&db);
    let worker = thread::spawn(move || {
        let conn = worker_db.connect();
        let results = conn.resolve(rx.recv().unwrap()).unwrap().unwrap();
        results.len().unwrap()
    });

    tx.send(Capsule::new(&source.objects("users").unwrap()).unwrap())
        .unwrap();
    assert_eq!(worker.join().unwrap(), 4);
}

#[test]
fn source_stays_pinned_until_remote_resolve() {
    let (db, source) = seeded(1);
    let (capsule_tx, capsule_rx) = mpsc::channel::<Capsule<Record>>();
    let (written_tx, written_rx) = mpsc::channel::<()>();
    let (go_tx, go_rx) = mpsc::channel::<()>();
    let (done_tx, done_rx) = mpsc::channel::<bool>();

    let worker_db = Arc::clone(&db);
    let worker = thread::spawn(move || {
        let conn = worker_db.connect();
        let capsule = capsule_rx.recv().unwrap();
        conn.write(|txn| txn.put(Key::new("users", "2"), Row::new()))
            .unwrap();
        written_tx.send(()).unwrap();

        go_rx.recv().unwrap();
        let found = conn.resolve(capsule).unwrap().is_some();
        done_tx.send(found).unwrap();
    });

    let record = source.find("users", "1").unwrap().unwrap();
    capsule_tx.send(Capsule::new(&record).unwrap()).unwrap();
    written_rx.recv().unwrap();

    // A newer version exists but the source cannot see it
    assert!(db.current_version() > source.version());
    assert!(!source.refresh().unwrap());
    assert!(source.find("users", "2").unwrap().is_none());

    go_tx.send(()).unwrap();
    assert!(done_rx.recv().unwrap());
    worker.join().unwrap();

    assert!(source.refresh().unwrap());
    assert!(source.find("users", "2").unwrap().is_some());
}

#[test]
fn deletion_before_remote_resolve_is_absent() {
    let (db, source) = seeded(1);
    let (tx, rx) = mpsc::channel::<Capsule<Record>>();

    let record = source.find("users", "1").unwrap().unwrap();
    let capsule = Capsule::new(&record).unwrap();
    source.write(|txn| txn.delete(&user("1"))).unwrap();
    tx.send(capsule).unwrap();

    let worker_db = Arc::clone(&db);
    let found = thread::spawn(move || {
        let conn = worker_db.connect();
        conn.resolve(rx.recv().unwrap()).unwrap().is_some()
    })
    .join()
    .unwrap();
    assert!(!found);
}

#[test]
fn racing_shared_resolvers_one_winner() {
    let (db, source) = seeded(1);
    let record = source.find("users", "1").unwrap().unwrap();
    let shared = Capsule::new(&record).unwrap().share();

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let winners = Arc::new(AtomicUsize::new(0));
    let losers = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let db = Arc::clone(&db);
            let shared = shared.clone();
            let barrier = Arc::clone(&barrier);
            let winners = Arc::clone(&winners);
            let losers = Arc::clone(&losers);
            thread::spawn(move || {
                let conn = db.connect();
                barrier.wait();
                match conn.resolve_shared(&shared) {
                    Ok(Some(record)) => {
                        assert_eq!(record.key(), &user("1"));
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(None) => panic!("record exists"),
                    Err(Error::AlreadyResolved { .. }) => losers.lock().push(i),
                    Err(e) => panic!("unexpected error: {e}"),
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(winners.load(Ordering::SeqCst), 1);
    assert_eq!(losers.lock().len(), threads - 1);
    assert!(!source.is_pinned());
}

#[test]
fn racing_resolve_and_discard_releases_once() {
    for _ in 0..20 {
        let (db, source) = seeded(1);
        let record = source.find("users", "1").unwrap().unwrap();
        let shared = Capsule::new(&record).unwrap().share();
        let barrier = Arc::new(Barrier::new(2));

        let resolver = {
            let db = Arc::clone(&db);
            let shared = shared.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let conn = db.connect();
                barrier.wait();
                conn.resolve_shared(&shared).is_ok()
            })
        };
        let discarder = {
            let shared = shared.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                shared.discard()
            })
        };

        let resolved = resolver.join().unwrap();
        let discarded = discarder.join().unwrap();
        assert!(resolved ^ discarded);
        assert!(!source.is_pinned());
        assert_eq!(db.retained_versions().len(), 1);
    }
}

#[test]
fn many_capsules_from_many_threads() {
    let (db, _seed) = seeded(16);
    let (tx, rx) = mpsc::channel::<Capsule<Record>>();

    let producers: Vec<_> = (1..=4)
        .map(|t| {
            let db = Arc::clone(&db);
            let tx = tx.clone();
            thread::spawn(move || {
                let conn = db.connect();
                for i in 0..4 {
                    let id = (t - 1) * 4 + i + 1;
                    let record = conn.find("users", &id.to_string()).unwrap().unwrap();
                    tx.send(Capsule::new(&record).unwrap()).unwrap();
                }
                // Keep the connection alive until every capsule is gone
                while conn.is_pinned() {
                    thread::yield_now();
                }
            })
        })
        .collect();
    drop(tx);

    let conn = db.connect();
    let mut seen: Vec<String> = rx
        .iter()
        .map(|capsule| conn.resolve(capsule).unwrap().unwrap().key().id.clone())
        .collect();
    for p in producers {
        p.join().unwrap();
    }

    seen.sort_by_key(|id| id.parse::<u32>().unwrap());
    let expected: Vec<String> = (1..=16).map(|i| i.to_string()).collect();
    assert_eq!(seen, expected);
}
