//! Embedded SQL migration runner.
//!
//! Migrations are SQL files embedded at compile time. They run sequentially
//! against a tenant database, tracked by the `_burrow_migrations` table.
//! Each migration runs exactly once per tenant — if it has already been
//! applied, it is skipped, which makes re-checking on every request a fast
//! no-op.

use crate::pool::DbPool;
use crate::tenant::TenantId;
use rusqlite::{Connection, TransactionBehavior};
use thiserror::Error;

/// A single embedded migration.
struct Migration {
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. New migrations are appended here.
const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "000_init",
        sql: include_str!("migrations/000_init.sql"),
    },
    Migration {
        name: "001_records",
        sql: include_str!("migrations/001_records.sql"),
    },
    Migration {
        name: "002_records_created_idx",
        sql: include_str!("migrations/002_records_created_idx.sql"),
    },
];

/// Errors that can occur during migration execution.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A SQL statement within a migration failed.
    #[error("migration '{name}' failed: {source}")]
    ExecutionFailed {
        /// The name of the migration that failed.
        name: String,
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },

    /// Failed to query migration state.
    #[error("failed to check migration state: {0}")]
    StateQuery(rusqlite::Error),
}

/// Errors from a per-request [`apply_pending`] call, carrying the tenant
/// whose database was being migrated.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// Could not check a connection out of the tenant's pool.
    #[error("tenant '{tenant}': could not acquire migration connection: {source}")]
    Acquire {
        /// The tenant whose pool was being drawn from.
        tenant: String,
        /// The underlying pool checkout error (exhaustion or timeout).
        source: r2d2::Error,
    },

    /// The migration run itself failed.
    #[error("tenant '{tenant}': {source}")]
    Migration {
        /// The tenant whose database was being migrated.
        tenant: String,
        /// The underlying migration failure.
        source: MigrationError,
    },
}

/// Brings a tenant database up to the current schema.
///
/// Checks one connection out of the pool (returned on every exit path when
/// it drops), then runs any pending migrations. Safe to call on every
/// request: an up-to-date database costs one indexed lookup per known
/// migration and no writes.
///
/// Concurrent calls against the same tenant are serialized by SQLite
/// itself: each pending step takes an immediate write transaction, so a
/// second runner blocks on the connection's busy timeout and then sees the
/// step already tracked.
///
/// # Errors
///
/// Returns [`ApplyError::Acquire`] if no connection could be checked out
/// within the pool's timeout, or [`ApplyError::Migration`] if a pending
/// step failed. A failed apply leaves the pool open and usable; a later
/// call retries the remaining migrations.
pub fn apply_pending(pool: &DbPool, tenant: &TenantId) -> Result<usize, ApplyError> {
    let mut conn = pool.get().map_err(|e| ApplyError::Acquire {
        tenant: tenant.as_str().to_string(),
        source: e,
    })?;

    run_migrations(&mut conn).map_err(|e| ApplyError::Migration {
        tenant: tenant.as_str().to_string(),
        source: e,
    })
}

/// Runs all pending migrations against the given connection.
///
/// Migrations that have already been applied (tracked in
/// `_burrow_migrations`) are skipped. New migrations are applied in order
/// and recorded. Returns the number applied.
///
/// Each pending migration runs inside an immediate (write-locking)
/// transaction, with the applied check repeated inside it. A concurrent
/// runner migrating the same database therefore blocks on the write lock
/// and then observes the step as already applied, rather than applying it
/// twice or failing on half-created schema.
///
/// # Errors
///
/// Returns `MigrationError` if any migration fails to execute or if the
/// migration tracking table cannot be queried.
pub fn run_migrations(conn: &mut Connection) -> Result<usize, MigrationError> {
    run_migrations_from_list(conn, MIGRATIONS)
}

fn already_applied(conn: &Connection, name: &str) -> Result<bool, MigrationError> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM _burrow_migrations WHERE name = ?1",
        [name],
        |row| row.get(0),
    )
    .map_err(MigrationError::StateQuery)
}

fn run_migrations_from_list(
    conn: &mut Connection,
    migrations: &[Migration],
) -> Result<usize, MigrationError> {
    // Ensure the tracking table exists before checking what's been applied.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _burrow_migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| MigrationError::ExecutionFailed {
        name: "_burrow_migrations_bootstrap".to_string(),
        source: e,
    })?;

    let mut applied = 0;

    for migration in migrations {
        if already_applied(conn, migration.name)? {
            tracing::debug!(
                migration = migration.name,
                "migration already applied, skipping"
            );
            continue;
        }

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| MigrationError::ExecutionFailed {
                name: migration.name.to_string(),
                source: e,
            })?;

        // Re-check under the write lock: a concurrent runner may have
        // applied this step between the unlocked check and here.
        if already_applied(&tx, migration.name)? {
            continue;
        }

        tracing::info!(migration = migration.name, "applying migration");

        tx.execute_batch(migration.sql)
            .map_err(|e| MigrationError::ExecutionFailed {
                name: migration.name.to_string(),
                source: e,
            })?;

        tx.execute(
            "INSERT INTO _burrow_migrations (name) VALUES (?1)",
            [migration.name],
        )
        .map_err(|e| MigrationError::ExecutionFailed {
            name: migration.name.to_string(),
            source: e,
        })?;

        tx.commit().map_err(|e| MigrationError::ExecutionFailed {
            name: migration.name.to_string(),
            source: e,
        })?;

        applied += 1;
    }

    Ok(applied)
}
