use crate::{blockchain::BlockHashMismatch, error::DbError, trie::legacy::LegacyDecodeError, trie::NodeCodecError};
use std::borrow::Cow;

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Database version {db_version} is newer than binary supports ({binary_version}). Upgrade the binary.")]
    DatabaseNewerThanBinary { db_version: u64, binary_version: u64 },

    #[error("Migration '{name}' (v{from_version} -> v{to_version}) failed: {source}")]
    MigrationStepFailed {
        name: &'static str,
        from_version: u64,
        to_version: u64,
        #[source]
        source: Box<MigrationError>,
    },

    #[error("Data integrity error: {0}")]
    Integrity(Cow<'static, str>),

    #[error(transparent)]
    BlockHash(#[from] BlockHashMismatch),

    #[error("Malformed trie node: {0}")]
    NodeCodec(#[from] NodeCodecError),

    #[error("Malformed legacy trie node: {0}")]
    LegacyNodeCodec(#[from] LegacyDecodeError),

    #[error("Value codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl MigrationError {
    pub fn integrity(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Integrity(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MigrationError::DatabaseNewerThanBinary { db_version: 10, binary_version: 9 };
        assert!(err.to_string().contains("10") && err.to_string().contains("9"));

        let err = MigrationError::MigrationStepFailed {
            name: "relocate contract storage root keys",
            from_version: 1,
            to_version: 2,
            source: Box::new(MigrationError::integrity("prefix not found")),
        };
        let message = err.to_string();
        assert!(message.contains("v1 -> v2"), "{message}");
        assert!(message.contains("prefix not found"), "{message}");
    }
}
