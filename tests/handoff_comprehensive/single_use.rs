//! A capsule resolves at most once

use crate::common::{seeded, user};
use vessel::{Capsule, CapsuleState, Error, Record};

#[test]
fn resolve_consumes_capsule() {
    let (db, source) = seeded(1);
    let record = source.find("users", "1").unwrap().unwrap();
    let capsule = Capsule::new(&record).unwrap();
    assert_eq!(capsule.state(), CapsuleState::Unconsumed);

    let target = db.connect();
    let resolved = target.resolve(capsule).unwrap().unwrap();
    assert_eq!(resolved.key(), &user("1"));
    // `capsule` was moved: a second `resolve(capsule)` does not compile
}

#[test]
fn shared_capsule_second_resolve_fails() {
    let (db, source) = seeded(1);
    let record = source.find("users", "1").unwrap().unwrap();
    let shared = Capsule::new(&record).unwrap().share();

    let first = db.connect();
    let second = db.connect();
    assert!(first.resolve_shared(&shared).unwrap().is_some());

    for conn in [&first, &second] {
        match conn.resolve_shared(&shared) {
            Err(Error::AlreadyResolved { kind }) => assert_eq!(kind, vessel::EntityKind::Record),
            other => panic!("expected AlreadyResolved, got {other:?}"),
        }
    }
    assert_eq!(shared.state(), CapsuleState::Resolved);
}

#[test]
fn absent_resolution_also_consumes() {
    let (db, source) = seeded(1);
    let record = source.find("users", "1").unwrap().unwrap();
    let shared = Capsule::new(&record).unwrap().share();
    source.write(|txn| txn.delete(&user("1"))).unwrap();

    let target = db.connect();
    let first: Option<Record> = target.resolve_shared(&shared).unwrap();
    assert!(first.is_none());
    assert!(matches!(
        target.resolve_shared(&shared),
        Err(Error::AlreadyResolved { .. })
    ));
    assert_eq!(shared.state(), CapsuleState::Absent);
}

#[test]
fn discarded_shared_capsule_cannot_resolve() {
    let (db, source) = seeded(1);
    let record = source.find("users", "1").unwrap().unwrap();
    let shared = Capsule::new(&record).unwrap().share();
    assert!(shared.discard());

    let err = db.connect().resolve_shared(&shared).unwrap_err();
    assert!(matches!(err, Error::AlreadyResolved { .. }));
    assert_eq!(shared.state(), CapsuleState::Abandoned);
}
