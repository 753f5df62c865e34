//! Kinds without a bridge are rejected; registered extensions work

use crate::common::seeded;
use vessel::{
    Bridge, Capsule, Connection, Database, EntityKind, Error, Payload, Query, Result,
    ThreadConfined,
};

/// Third-party entity: a position within a table's rows
struct Cursor {
    connection: Connection,
    table: String,
    position: usize,
}

impl ThreadConfined for Cursor {
    const KIND: EntityKind = EntityKind::Extension("cursor");

    fn connection(&self) -> Option<&Connection> {
        Some(&self.connection)
    }

    fn is_valid(&self) -> bool {
        !self.connection.is_closed()
    }
}

struct CursorBridge;

impl Bridge for CursorBridge {
    type Entity = Cursor;

    fn to_payload(&self, entity: &Cursor) -> Result<Payload> {
        Payload::encode(&(entity.table.as_str(), entity.position))
    }

    fn from_payload(&self, connection: &Connection, payload: &Payload) -> Result<Option<Cursor>> {
        let (table, position): (String, usize) = payload.decode()?;
        let Some(rows) = connection.evaluate(Query::table(table.clone()))? else {
            return Ok(None);
        };
        if position >= rows.len()? {
            return Ok(None);
        }
        Ok(Some(Cursor {
            connection: connection.clone(),
            table,
            position,
        }))
    }
}

#[test]
fn unregistered_kind_fails_without_pin() {
    let (db, source) = seeded(3);
    assert!(!db.supports(Cursor::KIND));
    let cursor = Cursor {
        connection: source.clone(),
        table: "users".into(),
        position: 1,
    };

    let err = Capsule::new(&cursor).unwrap_err();
    assert!(matches!(err, Error::UnsupportedKind(EntityKind::Extension("cursor"))));
    assert!(err.is_contract_violation());
    assert!(!source.is_pinned());
    assert_eq!(source.pin_count(), 0);
}

#[test]
fn registered_extension_round_trips() {
    let (db, source) = seeded(3);
    assert!(!db.register_bridge(CursorBridge));
    assert!(db.supports(Cursor::KIND));

    let cursor = Cursor {
        connection: source.clone(),
        table: "users".into(),
        position: 2,
    };
    let capsule = Capsule::new(&cursor).unwrap();
    assert_eq!(capsule.kind(), EntityKind::Extension("cursor"));
    assert!(source.is_pinned());

    let target = db.connect();
    let resolved = target.resolve(capsule).unwrap().unwrap();
    assert_eq!(resolved.table, "users");
    assert_eq!(resolved.position, 2);
    assert!(resolved.connection.same_connection(&target));
    assert!(!source.is_pinned());
}

#[test]
fn database_without_default_bridges_rejects_records() {
    let db = Database::builder().without_default_bridges().build();
    let conn = db.connect();
    conn.write(|txn| {
        txn.create_table("t")?;
        txn.put(vessel::Key::new("t", "1"), vessel::Row::new())
    })
    .unwrap();

    let record = conn.find("t", "1").unwrap().unwrap();
    assert!(matches!(
        Capsule::new(&record),
        Err(Error::UnsupportedKind(EntityKind::Record))
    ));
    let set = conn.objects("t").unwrap();
    assert!(matches!(
        Capsule::new(&set),
        Err(Error::UnsupportedKind(EntityKind::ResultSet))
    ));
    assert!(!conn.is_pinned());
}
