use rusqlite::{Connection, OptionalExtension, Result, Row, params};
use serde::{Deserialize, Serialize};

/// One physical network interface: a globally unique hardware address and the
/// entity that currently claims it. The owning foreign key is repointable;
/// devices are never deleted by normal operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub mac: String,
    pub hostname: Option<String>,
    pub entity_id: i64,
}

impl Device {
    pub fn create_table_if_not_exists(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS devices (
                id INTEGER PRIMARY KEY,
                mac TEXT NOT NULL UNIQUE,
                hostname TEXT,
                entity_id INTEGER NOT NULL REFERENCES tracked_entities (id) ON DELETE CASCADE
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_devices_mac ON devices (mac);",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_devices_entity_id ON devices (entity_id);",
            [],
        )?;
        Ok(())
    }

    pub fn insert(
        conn: &Connection,
        mac: &str,
        hostname: Option<&str>,
        entity_id: i64,
    ) -> Result<Device> {
        conn.execute(
            "INSERT INTO devices (mac, hostname, entity_id) VALUES (?1, ?2, ?3)",
            params![mac, hostname, entity_id],
        )?;
        Ok(Device {
            id: conn.last_insert_rowid(),
            mac: mac.to_string(),
            hostname: hostname.map(|h| h.to_string()),
            entity_id,
        })
    }

    pub fn find_by_mac(conn: &Connection, mac: &str) -> Result<Option<Device>> {
        conn.query_row(
            "SELECT id, mac, hostname, entity_id FROM devices WHERE mac = ?1",
            params![mac],
            Self::from_row,
        )
        .optional()
    }

    /// Repoint the owning entity. This is how a previously differently-named
    /// device gets relabeled when its hardware address reappears.
    pub fn set_entity(conn: &Connection, id: i64, entity_id: i64) -> Result<usize> {
        conn.execute(
            "UPDATE devices SET entity_id = ?1 WHERE id = ?2",
            params![entity_id, id],
        )
    }

    pub fn for_entity(conn: &Connection, entity_id: i64) -> Result<Vec<Device>> {
        let mut stmt = conn.prepare(
            "SELECT id, mac, hostname, entity_id FROM devices WHERE entity_id = ?1 ORDER BY id",
        )?;
        let devices = stmt
            .query_map(params![entity_id], Self::from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(devices)
    }

    fn from_row(row: &Row<'_>) -> Result<Device> {
        Ok(Device {
            id: row.get(0)?,
            mac: row.get(1)?,
            hostname: row.get(2)?,
            entity_id: row.get(3)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::new_test_connection;
    use crate::presence::entity::TrackedEntity;

    #[test]
    fn test_insert_and_find_by_mac() {
        let conn = new_test_connection();
        let entity = TrackedEntity::insert(&conn, "alex").unwrap();
        let inserted =
            Device::insert(&conn, "1a:2b:3c:4d:5e:6f", Some("laptop"), entity.id).unwrap();

        let found = Device::find_by_mac(&conn, "1a:2b:3c:4d:5e:6f").unwrap().unwrap();
        assert_eq!(found, inserted);
        assert!(Device::find_by_mac(&conn, "6f:5e:4d:3c:2b:1a").unwrap().is_none());
    }

    #[test]
    fn test_insert_duplicate_mac_is_constraint_violation() {
        let conn = new_test_connection();
        let entity = TrackedEntity::insert(&conn, "alex").unwrap();
        Device::insert(&conn, "1a:2b:3c:4d:5e:6f", None, entity.id).unwrap();

        let err = Device::insert(&conn, "1a:2b:3c:4d:5e:6f", None, entity.id).unwrap_err();
        match err {
            rusqlite::Error::SqliteFailure(e, _) => {
                assert_eq!(e.code, rusqlite::ErrorCode::ConstraintViolation);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_insert_requires_existing_entity() {
        let conn = new_test_connection();
        assert!(Device::insert(&conn, "1a:2b:3c:4d:5e:6f", None, 42).is_err());
    }

    #[test]
    fn test_set_entity_repoints_owner() {
        let conn = new_test_connection();
        let first = TrackedEntity::insert(&conn, "alex").unwrap();
        let second = TrackedEntity::insert(&conn, "sam").unwrap();
        let device = Device::insert(&conn, "1a:2b:3c:4d:5e:6f", None, first.id).unwrap();

        Device::set_entity(&conn, device.id, second.id).unwrap();

        let moved = Device::find_by_mac(&conn, "1a:2b:3c:4d:5e:6f").unwrap().unwrap();
        assert_eq!(moved.entity_id, second.id);
        assert!(Device::for_entity(&conn, first.id).unwrap().is_empty());
        assert_eq!(Device::for_entity(&conn, second.id).unwrap().len(), 1);
    }
}
