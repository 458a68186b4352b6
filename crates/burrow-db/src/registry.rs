//! Per-tenant connection pool registry.
//!
//! Maps tenant keys to their open connection pools. A pool is built on the
//! first access for a key and retained for the life of the process; the
//! registry owns every pool it retains and closes them all at shutdown.
//!
//! First access is optimistic: the pool is constructed without holding any
//! lock, then published with an atomic insert-if-absent. Two callers racing
//! on a fresh key may both construct a pool, but exactly one is retained —
//! the loser's candidate is dropped, releasing its connections.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use crate::pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
use crate::tenant::TenantId;

/// Errors that can occur while resolving a tenant's pool.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Building the tenant's physical pool failed. Nothing was published;
    /// the next resolve for the same tenant retries from scratch.
    #[error("tenant '{tenant}': pool creation failed: {source}")]
    PoolCreation {
        /// The tenant whose pool could not be built.
        tenant: String,
        /// The underlying construction failure.
        source: PoolError,
    },
}

/// Concurrent registry of per-tenant connection pools.
///
/// All lock acquisitions are brief HashMap operations (get/insert/drain)
/// that never span `.await` points, making a synchronous `RwLock` safe and
/// cheaper than an async lock. Insertion is the map's only mutation, so a
/// poisoned lock cannot expose partial state and is recovered rather than
/// propagated.
pub struct TenantRegistry {
    /// Directory holding one SQLite database file per tenant.
    data_dir: PathBuf,

    /// Pool tunables shared by every tenant pool.
    settings: DbRuntimeSettings,

    /// The retained pools, keyed by tenant.
    pools: RwLock<HashMap<String, Arc<DbPool>>>,
}

impl TenantRegistry {
    /// Creates an empty registry rooted at `data_dir`.
    ///
    /// The directory is not created here; the server ensures it exists at
    /// startup, and pool construction fails cleanly if it does not.
    pub fn new(data_dir: impl Into<PathBuf>, settings: DbRuntimeSettings) -> Self {
        Self {
            data_dir: data_dir.into(),
            settings,
            pools: RwLock::new(HashMap::new()),
        }
    }

    /// The database file backing a tenant.
    pub fn db_path(&self, tenant: &TenantId) -> PathBuf {
        self.data_dir.join(format!("{}.db", tenant.as_str()))
    }

    /// Returns the open pool for `tenant`, building it on first access.
    ///
    /// The fast path is a read-locked map lookup and an `Arc` clone —
    /// nothing is constructed for a known tenant. On first access the pool
    /// is built outside any lock and published with insert-if-absent; if
    /// another caller published first, the freshly built candidate is
    /// dropped and the winner's pool is returned. After this returns,
    /// exactly one pool is retained for the tenant process-wide.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::PoolCreation`] if the tenant's database
    /// file cannot be opened or the pool cannot establish connections. No
    /// entry is published on failure, so a later call retries.
    pub fn resolve(&self, tenant: &TenantId) -> Result<Arc<DbPool>, RegistryError> {
        {
            let pools = self.pools.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(pool) = pools.get(tenant.as_str()) {
                return Ok(Arc::clone(pool));
            }
        }

        // First access for this key: build the pool before taking the write
        // lock. Racing callers may each build one; publication below keeps
        // exactly one.
        let db_path = self.db_path(tenant);
        let candidate = create_pool(&db_path.to_string_lossy(), self.settings).map_err(|e| {
            RegistryError::PoolCreation {
                tenant: tenant.as_str().to_string(),
                source: e,
            }
        })?;
        let candidate = Arc::new(candidate);

        let mut pools = self.pools.write().unwrap_or_else(PoisonError::into_inner);
        match pools.entry(tenant.as_str().to_string()) {
            Entry::Occupied(existing) => {
                // Lost the publication race. Dropping the candidate closes
                // its freshly opened connections.
                tracing::debug!(
                    tenant = tenant.as_str(),
                    "lost pool creation race, discarding candidate pool"
                );
                drop(candidate);
                Ok(Arc::clone(existing.get()))
            }
            Entry::Vacant(slot) => {
                tracing::info!(
                    tenant = tenant.as_str(),
                    path = %db_path.display(),
                    "created tenant pool"
                );
                slot.insert(Arc::clone(&candidate));
                Ok(candidate)
            }
        }
    }

    /// Closes every retained pool and empties the registry.
    ///
    /// Dropping the registry's `Arc`s releases each pool's physical
    /// connections (the registry holds the only long-lived references).
    /// Intended for service teardown, after traffic has stopped.
    pub fn shutdown_all(&self) {
        let mut pools = self.pools.write().unwrap_or_else(PoisonError::into_inner);
        let count = pools.len();
        pools.clear();
        tracing::info!(count, "closed all tenant pools");
    }

    /// Number of tenants with a retained pool.
    pub fn len(&self) -> usize {
        self.pools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the registry holds no pools.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
