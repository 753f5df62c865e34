//! Outstanding capsules hold the source connection's version

use crate::common::{seeded, user};
use vessel::{Capsule, Error, Row, Version};

#[test]
fn source_does_not_advance_while_capsule_outstanding() {
    let (db, source) = seeded(2);
    let record = source.find("users", "1").unwrap().unwrap();
    let capsule = Capsule::new(&record).unwrap();
    let pinned_at = source.version();

    let writer = db.connect();
    writer
        .write(|txn| txn.put(user("3"), Row::new().with("name", "late")))
        .unwrap();

    // Explicit refresh is a no-op
    assert!(!source.refresh().unwrap());
    // Automatic advancement on read is deferred
    assert!(source.find("users", "3").unwrap().is_none());
    assert_eq!(source.objects("users").unwrap().len().unwrap(), 2);
    assert_eq!(source.version(), pinned_at);

    writer.resolve(capsule).unwrap().unwrap();
    assert!(!source.is_pinned());
    assert!(source.refresh().unwrap());
    assert!(source.find("users", "3").unwrap().is_some());
}

#[test]
fn pin_released_only_after_last_capsule() {
    let (db, source) = seeded(2);
    let r1 = source.find("users", "1").unwrap().unwrap();
    let r2 = source.find("users", "2").unwrap().unwrap();
    let c1 = Capsule::new(&r1).unwrap();
    let c2 = Capsule::new(&r2).unwrap();
    let c3 = Capsule::new(&source.objects("users").unwrap()).unwrap();
    assert_eq!(source.pin_count(), 3);

    db.connect()
        .write(|txn| txn.delete(&user("2")))
        .unwrap();
    let target = db.connect();

    target.resolve(c1).unwrap().unwrap();
    assert!(!source.refresh().unwrap());
    assert!(target.resolve(c2).unwrap().is_none());
    assert!(!source.refresh().unwrap());

    let set = target.resolve(c3).unwrap().unwrap();
    assert_eq!(set.len().unwrap(), 1);
    assert_eq!(source.pin_count(), 0);
    assert!(source.refresh().unwrap());
}

#[test]
fn pinned_source_cannot_write_when_behind() {
    let (db, source) = seeded(1);
    let record = source.find("users", "1").unwrap().unwrap();
    let capsule = Capsule::new(&record).unwrap();

    db.connect().write(|txn| txn.delete(&user("1"))).unwrap();
    let err = source
        .write(|txn| txn.put(user("9"), Row::new()))
        .unwrap_err();
    assert!(matches!(err, Error::VersionPinned { .. }));
    assert!(!err.is_contract_violation());

    capsule.discard();
    source.write(|txn| txn.put(user("9"), Row::new())).unwrap();
    assert_eq!(source.version(), Version::new(3));
}

#[test]
fn pinned_version_survives_garbage_collection() {
    let (db, source) = seeded(1);
    let record = source.find("users", "1").unwrap().unwrap();
    let capsule = Capsule::new(&record).unwrap();

    let writer = db.connect();
    for n in 0..3i64 {
        writer
            .write(|txn| txn.put(user("1"), Row::new().with("n", n)))
            .unwrap();
    }
    db.collect_garbage();

    // The source still reads its pinned version
    assert_eq!(
        record.get("name").unwrap(),
        Some(vessel::Value::from("user-1"))
    );
    drop(capsule);
    assert!(source.refresh().unwrap());
    assert_eq!(record.get("n").unwrap(), Some(vessel::Value::Int(2)));
}
