use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Result, Row, params};
use serde::{Deserialize, Serialize};

/// The persistent named identity a person is mapped to. Owns zero or more
/// devices; the name is unique case-sensitively after sanitization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEntity {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
}

impl TrackedEntity {
    pub fn create_table_if_not_exists(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS tracked_entities (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tracked_entities_name ON tracked_entities (name);",
            [],
        )?;
        Ok(())
    }

    /// Insert a new entity stamped with the current time. The name must
    /// already be sanitized; a duplicate surfaces as a constraint violation.
    pub fn insert(conn: &Connection, name: &str) -> Result<TrackedEntity> {
        let created_at = Utc::now().timestamp();
        conn.execute(
            "INSERT INTO tracked_entities (name, created_at) VALUES (?1, ?2)",
            params![name, created_at],
        )?;
        Ok(TrackedEntity {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            created_at,
        })
    }

    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<TrackedEntity>> {
        conn.query_row(
            "SELECT id, name, created_at FROM tracked_entities WHERE name = ?1",
            params![name],
            Self::from_row,
        )
        .optional()
    }

    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<TrackedEntity>> {
        conn.query_row(
            "SELECT id, name, created_at FROM tracked_entities WHERE id = ?1",
            params![id],
            Self::from_row,
        )
        .optional()
    }

    pub fn all(conn: &Connection) -> Result<Vec<TrackedEntity>> {
        let mut stmt =
            conn.prepare("SELECT id, name, created_at FROM tracked_entities ORDER BY id")?;
        let entities = stmt
            .query_map([], Self::from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(entities)
    }

    /// Rename in place. Returns the number of rows touched; zero means the
    /// entity does not exist. Uniqueness is enforced by the schema.
    pub fn set_name(conn: &Connection, id: i64, name: &str) -> Result<usize> {
        conn.execute(
            "UPDATE tracked_entities SET name = ?1 WHERE id = ?2",
            params![name, id],
        )
    }

    fn from_row(row: &Row<'_>) -> Result<TrackedEntity> {
        Ok(TrackedEntity {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
        })
    }
}
