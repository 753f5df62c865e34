//! Property tests over arbitrary capsule lifecycles

use crate::common::{seeded, user};
use proptest::prelude::*;
use vessel::{Capsule, CapsuleState, Error, Record, Row};

#[derive(Debug, Clone)]
enum Action {
    Capture(usize),
    ResolveOldest,
    DiscardNewest,
    WriteElsewhere(usize),
    DeleteElsewhere(usize),
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (1usize..=4).prop_map(Action::Capture),
        Just(Action::ResolveOldest),
        Just(Action::DiscardNewest),
        (1usize..=4).prop_map(Action::WriteElsewhere),
        (1usize..=4).prop_map(Action::DeleteElsewhere),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The pin count always equals the number of outstanding capsules, and
    /// the source version only moves when none are outstanding.
    #[test]
    fn pins_track_outstanding_capsules(actions in prop::collection::vec(action(), 1..40)) {
        let (db, source) = seeded(4);
        let other = db.connect();
        let mut outstanding: Vec<Capsule<Record>> = Vec::new();

        for action in actions {
            let before = source.version();
            let was_pinned = source.is_pinned();
            match action {
                Action::Capture(id) => {
                    source.refresh().unwrap();
                    if let Some(record) = source.lookup(&user(&id.to_string())).unwrap() {
                        outstanding.push(Capsule::new(&record).unwrap());
                    }
                }
                Action::ResolveOldest => {
                    if !outstanding.is_empty() {
                        let capsule = outstanding.remove(0);
                        other.resolve(capsule).unwrap();
                    }
                }
                Action::DiscardNewest => {
                    if let Some(capsule) = outstanding.pop() {
                        capsule.discard();
                    }
                }
                Action::WriteElsewhere(id) => {
                    other.refresh().unwrap();
                    other.write(|txn| txn.put(user(&id.to_string()), Row::new().with("n", 1i64))).unwrap();
                }
                Action::DeleteElsewhere(id) => {
                    other.refresh().unwrap();
                    other.write(|txn| txn.delete(&user(&id.to_string()))).unwrap();
                }
            }

            prop_assert_eq!(source.pin_count(), outstanding.len());
            prop_assert_eq!(source.is_pinned(), !outstanding.is_empty());
            if was_pinned {
                prop_assert_eq!(source.version(), before);
            }
            if source.is_pinned() {
                prop_assert!(!source.refresh().unwrap());
            }
        }

        outstanding.clear();
        prop_assert!(!source.is_pinned());
        source.refresh().unwrap();
        prop_assert_eq!(source.version(), db.current_version());
    }

    /// However many handles race, a shared capsule yields one outcome.
    #[test]
    fn shared_capsule_single_outcome(attempts in 1usize..10, delete_first in any::<bool>()) {
        let (db, source) = seeded(1);
        let record = source.find("users", "1").unwrap().unwrap();
        let shared = Capsule::new(&record).unwrap().share();
        if delete_first {
            source.write(|txn| txn.delete(&user("1"))).unwrap();
        }

        let target = db.connect();
        let mut outcomes = 0;
        for _ in 0..attempts {
            match target.resolve_shared(&shared) {
                Ok(found) => {
                    outcomes += 1;
                    prop_assert_eq!(found.is_some(), !delete_first);
                }
                Err(Error::AlreadyResolved { .. }) => {}
                Err(e) => return Err(TestCaseError::fail(e.to_string())),
            }
        }
        prop_assert_eq!(outcomes, 1);
        let expected = if delete_first { CapsuleState::Absent } else { CapsuleState::Resolved };
        prop_assert_eq!(shared.state(), expected);
        prop_assert!(!source.is_pinned());
    }
}
