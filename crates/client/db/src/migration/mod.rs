//! Database schema migrations.
//!
//! The schema version is an 8-byte big-endian integer stored at the [`Bucket::SchemaVersion`] prefix. A missing
//! version means a database that never ran any migration. The registry ([`get_migrations`]) is an ordered list:
//! migration `i` moves the schema from version `i` to version `i + 1`.
//!
//! ```text
//!   for each migration not yet applied:
//!       before()
//!       loop:
//!           open a transaction
//!           migrate(txn) ── Err ───────────────────▶ discard, abort the run at this version
//!               │
//!               ├── CallWithNewTransaction ──────▶ commit the progress, loop again
//!               │
//!               └── Done ──▶ version += 1, commit
//! ```
//!
//! Migrations that only need one transaction are plain functions ([`MigrationFn`]). Long-running ones keep a
//! cursor in their own state between calls, see [`batch::ResumableRewriter`]. That cursor lives in memory only:
//! after a restart, a migration starts again from [`Migration::before`] and must skip what it already did.
//!
//! # Adding a migration
//!
//! See the documentation in the [`revisions`] module.

pub mod batch;
mod config;
mod error;
mod registry;
pub mod revisions;

pub use config::{MigrationConfig, DEFAULT_TRIE_NODE_BATCH_SIZE};
pub use error::MigrationError;
pub use registry::{get_migrations, Migration, MigrationBody, MigrationFn, MigrationOutcome};

use crate::{
    bucket::Bucket,
    error::DbError,
    network::Network,
    storage::{view, Database, Transaction},
};
use std::time::Instant;

/// Result of checking migration status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStatus {
    /// No schema version stored yet. Every migration will run, starting with the emptiness check.
    FreshDatabase,

    /// Database is already at the required version.
    NoMigrationNeeded,

    /// Migrations need to be applied.
    MigrationRequired {
        /// Current database version
        current_version: u64,
        /// Target version
        target_version: u64,
        /// Number of migrations to apply
        migration_count: usize,
    },

    /// Database version is newer than the binary supports.
    DatabaseNewer {
        /// Database version
        db_version: u64,
        /// Binary's expected version
        binary_version: u64,
    },
}

/// The stored schema version, `None` when it was never written.
pub fn stored_schema_version(txn: &dyn Transaction) -> Result<Option<u64>, MigrationError> {
    let Some(bytes) = txn.get(&Bucket::SchemaVersion.prefix())? else { return Ok(None) };
    let bytes: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
        MigrationError::integrity(format!("schema version has {} bytes, expected 8", bytes.len()))
    })?;
    Ok(Some(u64::from_be_bytes(bytes)))
}

/// The schema version, 0 when it was never written.
pub fn schema_version(txn: &dyn Transaction) -> Result<u64, MigrationError> {
    Ok(stored_schema_version(txn)?.unwrap_or(0))
}

fn set_schema_version(txn: &dyn Transaction, version: u64) -> Result<(), DbError> {
    txn.set(&Bucket::SchemaVersion.prefix(), &version.to_be_bytes())
}

fn discard(txn: Box<dyn Transaction + '_>) {
    if let Err(err) = txn.discard() {
        tracing::warn!("Failed to discard migration transaction: {err:#}");
    }
}

/// Applies the registered migrations, in order, to a database.
pub struct MigrationRunner {
    migrations: Vec<Box<dyn Migration>>,
}

impl MigrationRunner {
    pub fn new(config: &MigrationConfig) -> Self {
        Self::with_migrations(get_migrations(config))
    }

    pub fn with_migrations(migrations: Vec<Box<dyn Migration>>) -> Self {
        Self { migrations }
    }

    /// Version of a database on which every registered migration has been applied.
    pub fn target_version(&self) -> u64 {
        self.migrations.len() as u64
    }

    /// Check migration status without running anything.
    pub fn check_status<D: Database + ?Sized>(&self, db: &D) -> Result<MigrationStatus, MigrationError> {
        let stored = view(db, stored_schema_version)?;
        let current_version = stored.unwrap_or(0);
        let target_version = self.target_version();

        if current_version > target_version {
            return Ok(MigrationStatus::DatabaseNewer { db_version: current_version, binary_version: target_version });
        }
        if current_version == target_version {
            return Ok(MigrationStatus::NoMigrationNeeded);
        }
        if stored.is_none() {
            return Ok(MigrationStatus::FreshDatabase);
        }
        Ok(MigrationStatus::MigrationRequired {
            current_version,
            target_version,
            migration_count: (target_version - current_version) as usize,
        })
    }

    /// Bring the database to [`Self::target_version`].
    ///
    /// On error the database stays at the version of the failing migration, whose writes are rolled back. Progress
    /// committed by earlier transactions of that migration is kept.
    pub fn run_migrations<D: Database + ?Sized>(&mut self, db: &D, network: &Network) -> Result<(), MigrationError> {
        let target_version = self.target_version();
        match self.check_status(db)? {
            MigrationStatus::NoMigrationNeeded => {
                tracing::debug!("✅ Database version {target_version} matches binary, no migration needed");
                return Ok(());
            }
            MigrationStatus::DatabaseNewer { db_version, binary_version } => {
                return Err(MigrationError::DatabaseNewerThanBinary { db_version, binary_version });
            }
            MigrationStatus::FreshDatabase => {
                tracing::info!("📦 Fresh database, creating at version {target_version}");
            }
            MigrationStatus::MigrationRequired { current_version, target_version, migration_count } => {
                tracing::info!(
                    "🔄 Starting database migration from v{current_version} to v{target_version} ({migration_count} migration(s))"
                );
            }
        }

        let current_version = view(db, schema_version)?;
        let started = Instant::now();
        for (from_version, migration) in (0u64..).zip(self.migrations.iter_mut()).skip(current_version as usize) {
            run_migration(db, network, migration.as_mut(), from_version)?;
        }
        tracing::info!("✅ Database migrated to v{target_version} in {:?}", started.elapsed());
        Ok(())
    }
}

fn run_migration<D: Database + ?Sized>(
    db: &D,
    network: &Network,
    migration: &mut dyn Migration,
    from_version: u64,
) -> Result<(), MigrationError> {
    let name = migration.name();
    let to_version = from_version + 1;
    tracing::info!("📦 Running migration '{name}' (v{from_version} -> v{to_version})");

    let started = Instant::now();
    migration.before();
    let mut attempt = 0u64;
    loop {
        attempt += 1;
        tracing::debug!("Migration '{name}': transaction #{attempt}");
        let txn = db.new_transaction(true)?;

        let outcome = match migration.migrate(&*txn, network) {
            Ok(outcome) => outcome,
            Err(err) => {
                discard(txn);
                tracing::error!("❌ Migration '{name}' (v{from_version} -> v{to_version}) failed: {err:#}");
                return Err(MigrationError::MigrationStepFailed {
                    name,
                    from_version,
                    to_version,
                    source: Box::new(err),
                });
            }
        };

        if outcome == MigrationOutcome::Done {
            if let Err(err) = set_schema_version(&*txn, to_version) {
                discard(txn);
                return Err(err.into());
            }
            txn.commit()?;
            tracing::info!(
                "✅ Migration '{name}' completed in {:?} ({attempt} transaction(s))",
                started.elapsed()
            );
            return Ok(());
        }

        txn.commit()?;
        tracing::debug!("Migration '{name}' needs a new transaction, progress committed");
    }
}
