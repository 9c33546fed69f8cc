//! Database schema migrations.
//!
//! Applied migrations are recorded in a `_migrations` table; each one is a SQL
//! batch from `crates/core/migrations/` applied inside a transaction.

use super::Error;
use tokio_rusqlite::{Connection, params};

/// A schema migration.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// Migrations in application order. All use CREATE IF NOT EXISTS.
const MIGRATIONS: &[Migration] = &[
    Migration { version: 1, name: "partitions", sql: include_str!("../../migrations/001_partitions.sql") },
    Migration { version: 2, name: "entries", sql: include_str!("../../migrations/002_entries.sql") },
];

/// Run any pending migrations.
///
/// Returns the number of migrations applied by this call.
///
/// # Errors
///
/// Returns an error if a migration SQL fails to execute; the failing
/// migration's transaction is rolled back.
pub async fn run(conn: &Connection) -> Result<usize, Error> {
    let applied = conn
        .call(|conn| -> Result<usize, Error> {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS _migrations (
                    version INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    applied_at TEXT NOT NULL
                )",
                [],
            )?;

            let current: i64 =
                conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

            let mut applied = 0;
            for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
                let tx = conn.transaction()?;
                tx.execute_batch(migration.sql)
                    .map_err(|e| Error::MigrationFailed(format!("{} ({}): {e}", migration.version, migration.name)))?;
                tx.execute(
                    "INSERT INTO _migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
                    params![migration.version, migration.name, chrono::Utc::now().to_rfc3339()],
                )?;
                tx.commit()?;
                applied += 1;
            }

            Ok(applied)
        })
        .await
        .map_err(Error::from)?;

    if applied > 0 {
        tracing::debug!(applied, "applied cache schema migrations");
    }

    Ok(applied)
}
