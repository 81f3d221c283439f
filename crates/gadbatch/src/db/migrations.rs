//! Schema steps applied in order and recorded in `_migrations`.

use rusqlite::{params, Connection};

use super::error::DatabaseError;

/// `(version, name, sql)`; versions strictly increase.
const MIGRATIONS: &[(u32, &str, &str)] = &[
    (
        1,
        "users_and_projects",
        include_str!("sql/001_create_users_and_projects.sql"),
    ),
    (
        2,
        "batch_tables",
        include_str!("sql/002_create_batch_tables.sql"),
    ),
    (
        3,
        "design_projects",
        include_str!("sql/003_create_design_projects.sql"),
    ),
];

const TRACKING_TABLE: &str = "CREATE TABLE IF NOT EXISTS _migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);";

/// Brings the schema up to the newest version. Each step runs in its own
/// transaction together with its `_migrations` row.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(TRACKING_TABLE)?;

    let applied: u32 = conn.query_row(
        "SELECT IFNULL(MAX(version), 0) FROM _migrations",
        [],
        |row| row.get(0),
    )?;

    for &(version, name, sql) in MIGRATIONS.iter().filter(|(v, _, _)| *v > applied) {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)
            .map_err(|source| DatabaseError::Migration {
                version,
                name,
                source,
            })?;
        tx.execute(
            "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
            params![version, name],
        )?;
        tx.commit()?;

        log::info!("Applied schema migration {} ({})", version, name);
    }

    Ok(())
}
