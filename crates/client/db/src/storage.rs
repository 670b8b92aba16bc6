//! Key-value store interface.
//!
//! The migration engine and the record helpers only talk to the store through these traits. Reads inside one
//! transaction are consistent, and every write made through a transaction becomes visible atomically on
//! [`Transaction::commit`]. [`RocksDBStorage`](crate::rocksdb::RocksDBStorage) is the production implementation.

use crate::error::DbError;

/// Ordered cursor over the keys visible from a transaction, including its own uncommitted writes.
///
/// A fresh iterator is not positioned: call [`DbIterator::seek`], or [`DbIterator::next`] which positions it
/// on the first key of the database.
pub trait DbIterator {
    /// Position on the first key `>= key`.
    fn seek(&mut self, key: &[u8]);
    fn valid(&self) -> bool;
    /// Advance to the next key. Returns whether the iterator is still valid.
    fn next(&mut self) -> bool;
    fn key(&self) -> Option<&[u8]>;
    fn value(&self) -> Result<&[u8], DbError>;
    /// Release the iterator, surfacing any error encountered while iterating.
    fn close(self: Box<Self>) -> Result<(), DbError>;
}

pub trait Transaction {
    /// Returns `None` when the key does not exist.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DbError>;
    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), DbError>;
    fn delete(&self, key: &[u8]) -> Result<(), DbError>;
    fn new_iterator(&self) -> Result<Box<dyn DbIterator + '_>, DbError>;
    fn commit(self: Box<Self>) -> Result<(), DbError>;
    fn discard(self: Box<Self>) -> Result<(), DbError>;
}

pub trait Database {
    fn new_transaction(&self, writable: bool) -> Result<Box<dyn Transaction + '_>, DbError>;
}

/// Run `f` in a new read-write transaction. The transaction is committed if `f` returns `Ok` and discarded
/// otherwise.
pub fn update<D, R, E>(db: &D, f: impl FnOnce(&dyn Transaction) -> Result<R, E>) -> Result<R, E>
where
    D: Database + ?Sized,
    E: From<DbError>,
{
    let txn = db.new_transaction(true)?;
    match f(&*txn) {
        Ok(res) => {
            txn.commit()?;
            Ok(res)
        }
        Err(err) => {
            if let Err(discard_err) = txn.discard() {
                tracing::warn!("Failed to discard transaction: {discard_err:#}");
            }
            Err(err)
        }
    }
}

/// Run `f` in a new read-only transaction, which is always discarded.
pub fn view<D, R, E>(db: &D, f: impl FnOnce(&dyn Transaction) -> Result<R, E>) -> Result<R, E>
where
    D: Database + ?Sized,
    E: From<DbError>,
{
    let txn = db.new_transaction(false)?;
    let res = f(&*txn);
    match txn.discard() {
        Ok(()) => res,
        Err(discard_err) => {
            res?;
            Err(discard_err.into())
        }
    }
}

/// Collect every `(key, value)` under `prefix`, in key order.
pub fn scan_prefix(txn: &dyn Transaction, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, DbError> {
    let mut it = txn.new_iterator()?;
    let entries = collect_prefix(&mut *it, prefix);
    let closed = it.close();
    let entries = entries?;
    closed?;
    Ok(entries)
}

fn collect_prefix(it: &mut dyn DbIterator, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, DbError> {
    let mut entries = vec![];
    it.seek(prefix);
    while let Some(key) = it.key() {
        if !key.starts_with(prefix) {
            break;
        }
        entries.push((key.to_vec(), it.value()?.to_vec()));
        it.next();
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rocksdb::tests::temp_db;

    #[test]
    fn test_update_commits_on_ok() {
        let db = temp_db();
        update(&*db, |txn| txn.set(b"key", b"value")).unwrap();

        let value = view(&*db, |txn| txn.get(b"key")).unwrap();
        assert_eq!(value.as_deref(), Some(&b"value"[..]));
    }

    #[test]
    fn test_update_discards_on_err() {
        let db = temp_db();
        let res: Result<(), DbError> = update(&*db, |txn| {
            txn.set(b"key", b"value")?;
            Err(DbError::Format("rejected".into()))
        });
        assert!(res.is_err());

        assert_eq!(view(&*db, |txn| txn.get(b"key")).unwrap(), None);
    }

    #[test]
    fn test_scan_prefix_stops_at_prefix_boundary() {
        let db = temp_db();
        update(&*db, |txn| {
            txn.set(&[1, 0], b"a")?;
            txn.set(&[2, 0], b"b")?;
            txn.set(&[2, 1], b"c")?;
            txn.set(&[3], b"d")
        })
        .unwrap();

        let entries = view(&*db, |txn| scan_prefix(txn, &[2])).unwrap();
        assert_eq!(entries, vec![(vec![2, 0], b"b".to_vec()), (vec![2, 1], b"c".to_vec())]);
    }
}
