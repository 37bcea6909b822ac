use rusqlite::Connection;

use crate::presence::{Device, TrackedEntity};

/// Handle to the SQLite database. Cheap to clone; every caller opens its own
/// connection, so blocking persistence work never shares one across tasks.
#[derive(Debug, Clone)]
pub struct Database {
    path: String,
}

impl Database {
    /// Open the database once at startup, applying pragmas and creating the
    /// schema. Later `connect` calls assume the schema exists.
    pub fn open(path: &str) -> Result<Database, rusqlite::Error> {
        let db = Database {
            path: path.to_string(),
        };
        let conn = db.connect()?;
        init_schema(&conn)?;
        Ok(db)
    }

    pub fn connect(&self) -> Result<Connection, rusqlite::Error> {
        let conn = Connection::open(&self.path).map_err(|e| {
            eprintln!("Failed to open database at '{}': {}", self.path, e);
            e
        })?;

        // Set busy timeout first (this doesn't require any locks)
        let _ = conn.execute("PRAGMA busy_timeout = 30000;", []);

        // Try to enable WAL mode (only needs to succeed once per database)
        // This may fail if another connection has an active transaction, which is OK
        let _ = conn.execute("PRAGMA journal_mode = WAL;", []);

        // NORMAL sync is safe with WAL mode
        let _ = conn.execute("PRAGMA synchronous = NORMAL;", []);

        // Cascade deletes from entities to their devices rely on this
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        Ok(conn)
    }
}

pub fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    TrackedEntity::create_table_if_not_exists(conn)?;
    Device::create_table_if_not_exists(conn)?;
    Ok(())
}

#[cfg(test)]
pub fn new_test_connection() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    conn.execute("PRAGMA foreign_keys = ON;", [])
        .expect("Failed to set foreign key pragma");
    init_schema(&conn).expect("Failed to create tables");
    conn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_schema() {
        let file = tempfile::NamedTempFile::new().expect("Failed to create temp database");
        let db = Database::open(file.path().to_str().unwrap()).unwrap();

        let conn = db.connect().unwrap();
        let tables: Vec<String> = conn
            .prepare(
                "SELECT name FROM sqlite_schema
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
                 ORDER BY name",
            )
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert_eq!(tables, vec!["devices", "tracked_entities"]);
    }

    #[test]
    fn test_deleting_entity_cascades_to_devices() {
        let conn = new_test_connection();
        let entity = TrackedEntity::insert(&conn, "alex").unwrap();
        Device::insert(&conn, "1a:2b:3c:4d:5e:6f", None, entity.id).unwrap();

        conn.execute(
            "DELETE FROM tracked_entities WHERE id = ?1",
            rusqlite::params![entity.id],
        )
        .unwrap();

        assert!(Device::find_by_mac(&conn, "1a:2b:3c:4d:5e:6f").unwrap().is_none());
    }
}
