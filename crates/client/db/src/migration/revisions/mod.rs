//! Database schema revisions.
//!
//! Files: `revision_XXXX.rs` where XXXX is the target version (e.g., `revision_0002.rs` = v1→v2).
//!
//! To add a new revision:
//! 1. Create `revision_XXXX.rs`, either with `pub fn migrate(txn: &dyn Transaction, network: &Network) ->
//!    Result<MigrationOutcome, MigrationError>` or with a type implementing [`Migration`](super::Migration) when
//!    the migration needs state across transactions
//! 2. Export module here
//! 3. Append it to `registry::get_migrations()`
//!
//! A migration may be interrupted by a crash at any point and replayed from the start on the next run: every
//! revision must be safe to apply again over its own partial output.

pub mod revision_0001;
pub mod revision_0002;
pub mod revision_0003;
pub mod revision_0004;
pub mod revision_0005;
