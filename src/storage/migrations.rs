//! Database migrations for the translation memory

use rusqlite::Connection;

use crate::error::Result;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Run all migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current_version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    if current_version < SCHEMA_VERSION {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Initial schema (v1)
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Source/translation pairs with their embeddings.
        -- embedding is a little-endian f32 blob; dimensions is denormalized
        -- so similarity search can skip rows from a different model.
        CREATE TABLE IF NOT EXISTS translation_pairs (
            id TEXT PRIMARY KEY,
            source_text TEXT NOT NULL,
            translation_text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            dimensions INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_pairs_created ON translation_pairs(created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_pairs_dimensions ON translation_pairs(dimensions);

        INSERT INTO schema_version (version) VALUES (1);
        "#,
    )?;

    Ok(())
}

/// Reference URL migration (v2)
///
/// Adds the public publication URL so recalled entries can be offered to
/// the model as link targets.
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        ALTER TABLE translation_pairs ADD COLUMN reference_url TEXT;

        INSERT INTO schema_version (version) VALUES (2);
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i32 = conn
            .query_row(
                "SELECT MAX(version) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_schema_has_reference_url() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        // Insert exercising every column, including the v2 one
        conn.execute(
            "INSERT INTO translation_pairs (id, source_text, translation_text, embedding, dimensions, reference_url)
             VALUES ('a', 's', 't', x'00000000', 1, 'https://example.com/1')",
            [],
        )
        .unwrap();
    }
}
