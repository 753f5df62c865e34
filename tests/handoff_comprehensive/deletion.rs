//! Deleted entities resolve to absent, never to an error

use crate::common::{seeded, user};
use vessel::{Capsule, CapsuleState, Record, ThreadConfined};

#[test]
fn record_deleted_on_source_resolves_absent() {
    let (db, source) = seeded(2);
    let record = source.find("users", "1").unwrap().unwrap();
    let shared = Capsule::new(&record).unwrap().share();

    source.write(|txn| txn.delete(&user("1"))).unwrap();
    assert!(!record.is_valid());

    let target = db.connect();
    let resolved: Option<Record> = target.resolve_shared(&shared).unwrap();
    assert!(resolved.is_none());
    assert_eq!(shared.state(), CapsuleState::Absent);
    assert!(!source.is_pinned());
}

#[test]
fn record_deleted_elsewhere_resolves_absent() {
    let (db, source) = seeded(1);
    let record = source.find("users", "1").unwrap().unwrap();
    let capsule = Capsule::new(&record).unwrap();

    db.connect().write(|txn| txn.delete(&user("1"))).unwrap();
    assert!(db.connect().resolve(capsule).unwrap().is_none());
    // Still valid on the pinned source
    assert!(record.is_valid());
}

#[test]
fn dropped_table_resolves_absent() {
    let (db, source) = seeded(2);
    let record = source.find("users", "1").unwrap().unwrap();
    let rec_capsule = Capsule::new(&record).unwrap();
    let set_capsule = Capsule::new(&source.objects("users").unwrap()).unwrap();

    source.write(|txn| txn.drop_table("users")).unwrap();

    let target = db.connect();
    assert!(target.resolve(rec_capsule).unwrap().is_none());
    assert!(target.resolve(set_capsule).unwrap().is_none());
    assert_eq!(source.pin_count(), 0);
}

#[test]
fn recreated_table_does_not_resurrect_record() {
    let (db, source) = seeded(1);
    let record = source.find("users", "1").unwrap().unwrap();
    let capsule = Capsule::new(&record).unwrap();

    source
        .write(|txn| {
            txn.drop_table("users")?;
            txn.create_table("users")
        })
        .unwrap();
    assert!(db.connect().resolve(capsule).unwrap().is_none());
}

#[test]
fn closed_target_resolves_absent() {
    let (db, source) = seeded(1);
    let record = source.find("users", "1").unwrap().unwrap();
    let capsule = Capsule::new(&record).unwrap();

    let target = db.connect();
    target.close();
    assert!(target.resolve(capsule).unwrap().is_none());
    assert!(!source.is_pinned());
}
