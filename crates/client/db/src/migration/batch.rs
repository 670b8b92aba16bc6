//! Rewriting whole buckets in bounded batches.
//!
//! A bucket can hold far more entries than fit in the write set of one transaction. [`ResumableRewriter`] keeps a
//! cursor per bucket and stops after `batch_size` rewritten entries, asking the runner for a new transaction. The
//! next call resumes exactly at the first entry that was not processed.

use super::{MigrationError, MigrationOutcome};
use crate::{
    bucket::{Bucket, DbKey},
    storage::{DbIterator, Transaction},
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketCursor {
    /// Next key to visit.
    pub seek_to: DbKey,
    /// Entries whose key has exactly this length are root pointers and are never rewritten.
    pub root_len: usize,
}

#[derive(Debug)]
pub struct ResumableRewriter {
    /// Buckets that still have entries to visit.
    buckets: BTreeMap<Bucket, BucketCursor>,
    batch_size: usize,
}

enum ScanEnd {
    Exhausted,
    BatchFull,
}

impl ResumableRewriter {
    pub fn new(buckets: impl IntoIterator<Item = (Bucket, usize)>, batch_size: usize) -> Self {
        let buckets = buckets
            .into_iter()
            .map(|(bucket, root_len)| (bucket, BucketCursor { seek_to: bucket.prefix(), root_len }))
            .collect();
        Self { buckets, batch_size: batch_size.max(1) }
    }

    pub fn is_done(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn cursor(&self, bucket: Bucket) -> Option<&BucketCursor> {
        self.buckets.get(&bucket)
    }

    /// Visit the remaining entries of every bucket in key order, replacing each value for which `convert` returns
    /// `Some`. Entries for which it returns `None` are left as is and do not count toward the batch.
    ///
    /// Writes are applied once the iterator is closed.
    pub fn rewrite<F>(&mut self, txn: &dyn Transaction, mut convert: F) -> Result<MigrationOutcome, MigrationError>
    where
        F: FnMut(&[u8], &[u8]) -> Result<Option<Vec<u8>>, MigrationError>,
    {
        let mut pending = Vec::new();
        let mut it = txn.new_iterator()?;
        let scanned = self.scan(&mut *it, &mut convert, &mut pending);
        let closed = it.close();
        let outcome = scanned?;
        closed?;

        tracing::debug!("Rewriting {} entries", pending.len());
        for (key, value) in pending {
            txn.set(&key, &value)?;
        }
        Ok(outcome)
    }

    fn scan<F>(
        &mut self,
        it: &mut dyn DbIterator,
        convert: &mut F,
        pending: &mut Vec<(Vec<u8>, Vec<u8>)>,
    ) -> Result<MigrationOutcome, MigrationError>
    where
        F: FnMut(&[u8], &[u8]) -> Result<Option<Vec<u8>>, MigrationError>,
    {
        let buckets: Vec<Bucket> = self.buckets.keys().copied().collect();
        for bucket in buckets {
            let Some(cursor) = self.buckets.get_mut(&bucket) else { continue };
            match scan_bucket(it, bucket, cursor, self.batch_size, convert, pending)? {
                ScanEnd::BatchFull => return Ok(MigrationOutcome::CallWithNewTransaction),
                ScanEnd::Exhausted => {
                    tracing::debug!("Bucket {bucket} fully rewritten");
                    self.buckets.remove(&bucket);
                }
            }
        }
        Ok(MigrationOutcome::Done)
    }
}

fn scan_bucket<F>(
    it: &mut dyn DbIterator,
    bucket: Bucket,
    cursor: &mut BucketCursor,
    batch_size: usize,
    convert: &mut F,
    pending: &mut Vec<(Vec<u8>, Vec<u8>)>,
) -> Result<ScanEnd, MigrationError>
where
    F: FnMut(&[u8], &[u8]) -> Result<Option<Vec<u8>>, MigrationError>,
{
    let prefix = [bucket.tag()];
    it.seek(&cursor.seek_to);
    while let Some(key) = it.key() {
        if !key.starts_with(&prefix) {
            break;
        }
        if key.len() != cursor.root_len {
            if pending.len() >= batch_size {
                cursor.seek_to = key.into();
                return Ok(ScanEnd::BatchFull);
            }
            if let Some(value) = convert(key, it.value()?)? {
                pending.push((key.to_vec(), value));
            }
        }
        it.next();
    }
    Ok(ScanEnd::Exhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        rocksdb::tests::temp_db,
        storage::{scan_prefix, update, view},
    };
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    /// Marks a value as rewritten, skipping values that already are.
    fn mark(_key: &[u8], value: &[u8]) -> Result<Option<Vec<u8>>, MigrationError> {
        if value.first() == Some(&0xff) {
            return Ok(None);
        }
        Ok(Some([&[0xff][..], value].concat()))
    }

    fn run_to_completion(db: &crate::rocksdb::RocksDBStorage, rewriter: &mut ResumableRewriter) -> usize {
        let mut calls = 0;
        loop {
            calls += 1;
            let outcome = update(db, |txn| rewriter.rewrite(txn, mark)).unwrap();
            if outcome == MigrationOutcome::Done {
                return calls;
            }
        }
    }

    #[test]
    fn test_batch_cap_resumes_at_unprocessed_key() {
        let db = temp_db();
        update(&*db, |txn| (0u8..5).try_for_each(|i| txn.set(&[0, 1, i], &[i]))).unwrap();

        let mut rewriter = ResumableRewriter::new([(Bucket::StateTrie, 1)], 2);
        let outcome = update(&*db, |txn| rewriter.rewrite(txn, mark)).unwrap();
        assert_eq!(outcome, MigrationOutcome::CallWithNewTransaction);
        assert_eq!(&rewriter.cursor(Bucket::StateTrie).unwrap().seek_to[..], &[0, 1, 2]);

        let entries = view(&*db, |txn| scan_prefix(txn, &[0])).unwrap();
        assert_eq!(entries[1].1, vec![0xff, 1]);
        assert_eq!(entries[2].1, vec![2]);

        assert_eq!(run_to_completion(&db, &mut rewriter), 2);
        assert!(rewriter.is_done());
    }

    #[test]
    fn test_root_pointers_are_untouched() {
        let db = temp_db();
        update(&*db, |txn| {
            txn.set(&[3; 33], b"root")?;
            txn.set(&[3; 34], b"node")?;
            txn.set(&[13], b"root")?;
            txn.set(&[13, 0], b"node")
        })
        .unwrap();

        let mut rewriter = ResumableRewriter::new([(Bucket::ContractStorage, 33), (Bucket::ClassesTrie, 1)], 10);
        assert_eq!(run_to_completion(&db, &mut rewriter), 1);

        view(&*db, |txn| {
            assert_eq!(txn.get(&[3; 33])?.as_deref(), Some(&b"root"[..]));
            assert_eq!(txn.get(&[3; 34])?.as_deref(), Some(&b"\xffnode"[..]));
            assert_eq!(txn.get(&[13])?.as_deref(), Some(&b"root"[..]));
            assert_eq!(txn.get(&[13, 0])?.as_deref(), Some(&b"\xffnode"[..]));
            Ok::<_, MigrationError>(())
        })
        .unwrap();
    }

    #[test]
    fn test_skipped_entries_do_not_count() {
        let db = temp_db();
        update(&*db, |txn| {
            txn.set(&[0, 1], &[0xff])?;
            txn.set(&[0, 2], &[0xff])?;
            txn.set(&[0, 3], &[3])
        })
        .unwrap();

        let mut rewriter = ResumableRewriter::new([(Bucket::StateTrie, 1)], 1);
        assert_eq!(run_to_completion(&db, &mut rewriter), 1);
    }

    #[test]
    fn test_empty_buckets() {
        let db = temp_db();
        update(&*db, |txn| txn.set(&[4, 0], b"other bucket")).unwrap();
        let mut rewriter = ResumableRewriter::new([(Bucket::StateTrie, 1), (Bucket::ContractStorage, 33)], 1);
        assert_eq!(run_to_completion(&db, &mut rewriter), 1);
        assert_eq!(view(&*db, |txn| txn.get(&[4, 0])).unwrap().as_deref(), Some(&b"other bucket"[..]));
    }

    #[test]
    fn test_convert_error_writes_nothing() {
        let db = temp_db();
        update(&*db, |txn| txn.set(&[0, 1], &[1])).unwrap();

        let mut rewriter = ResumableRewriter::new([(Bucket::StateTrie, 1)], 10);
        let res = update(&*db, |txn| rewriter.rewrite(txn, |_, _| Err(MigrationError::integrity("corrupt"))));
        assert!(matches!(res, Err(MigrationError::Integrity(_))));
        assert_eq!(view(&*db, |txn| txn.get(&[0, 1])).unwrap(), Some(vec![1]));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn test_every_entry_rewritten_exactly_once(
            suffixes in prop::collection::btree_set(prop::collection::vec(any::<u8>(), 1..4), 0..40),
            batch_size in 1usize..8,
        ) {
            let db = temp_db();
            let seeded: BTreeMap<Vec<u8>, Vec<u8>> =
                suffixes.into_iter().map(|suffix| ([&[0u8][..], &suffix].concat(), [&[1u8][..], &suffix].concat())).collect();
            update(&*db, |txn| seeded.iter().try_for_each(|(k, v)| txn.set(k, v))).unwrap();

            let mut rewriter = ResumableRewriter::new([(Bucket::StateTrie, 1)], batch_size);
            let mut seen = BTreeMap::<Vec<u8>, usize>::new();
            loop {
                let outcome = update(&*db, |txn| {
                    rewriter.rewrite(txn, |key, value| {
                        *seen.entry(key.to_vec()).or_default() += 1;
                        mark(key, value)
                    })
                })
                .unwrap();
                if outcome == MigrationOutcome::Done {
                    break;
                }
            }

            prop_assert_eq!(seen.len(), seeded.len());
            prop_assert!(seen.values().all(|n| *n == 1));
            let stored = view(&*db, |txn| scan_prefix(txn, &[0])).unwrap();
            for (key, value) in stored {
                prop_assert_eq!(&value[1..], &seeded[&key][..]);
            }
        }
    }
}
