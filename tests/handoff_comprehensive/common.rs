//! Shared helpers for the handoff suite

#![allow(dead_code)]

use std::sync::{Arc, Once};
use vessel::{Connection, Database, Key, Row};

static INIT_TRACING: Once = Once::new();

/// Route engine logs to the test harness output
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// Database with a `users` table holding ids 1..=n
pub fn seeded(n: usize) -> (Arc<Database>, Connection) {
    init_tracing();
    let db = Database::ephemeral();
    let conn = db.connect();
    conn.write(|txn| {
        txn.create_table("users")?;
        for i in 1..=n {
            txn.put(
                Key::new("users", i.to_string()),
                Row::new()
                    .with("name", format!("user-{i}"))
                    .with("age", 20 + i as i64),
            )?;
        }
        Ok(())
    })
    .unwrap();
    (db, conn)
}

pub fn user(id: &str) -> Key {
    Key::new("users", id)
}
