//! Database layer for the burrow tenant-provisioning service.
//!
//! Provides per-tenant SQLite connection pooling (via `r2d2`), WAL-mode
//! initialization, embedded SQL migrations, and the tenant pool registry.
//! Every tenant gets its own database file, created on first access and
//! migrated to the current schema before any request touches it.
//!
//! # Design decisions
//!
//! - **SQLite, one file per tenant**: tenant isolation at the storage level
//!   with no external database process. WAL mode allows concurrent readers
//!   with a single writer per tenant database.
//! - **`r2d2` connection pool per tenant**: bounded connection reuse with a
//!   fixed acquisition-timeout ceiling, no manual lifetime management.
//! - **Optimistic registry publication**: first access builds a pool
//!   without holding a lock, then publishes it with an atomic
//!   insert-if-absent; the loser of a race discards its candidate. The hot
//!   read path never contends with construction.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!` and re-checked on every access, so a tenant database is
//!   always current before use and migrations cannot drift from the code
//!   that depends on them.

mod migrations;
mod pool;
mod registry;
mod tenant;

pub use migrations::{apply_pending, run_migrations, ApplyError, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
pub use registry::{RegistryError, TenantRegistry};
pub use tenant::{TenantId, TenantKeyError};
