//! Scratch bit-set pool
//!
//! Query execution needs mutable working sets sized to the document count.
//! They are handed out by two cooperating levels:
//!
//! - `BitSetPool`: one per database, shared across threads. Bounds the number
//!   of scratch sets in flight and keeps a free list of returned sets.
//! - `QueryContext`: one per thread or worker, passed into every query call.
//!   Caches the sets most recently returned on that thread so repeated queries
//!   reuse them without touching the shared free list, and marks itself busy
//!   while a query runs.
//!
//! Each query opens a `ScratchPool` on its context. Borrowing past the
//! per-query or process-wide quota fails immediately. Nothing blocks.
//! A scratch pool is single-use: borrowing or returning after `release`, or
//! releasing twice, is an error.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::errors::{PoolError, PoolResult};
use super::{ArrayBitSet, BitSet};

/// Sets a context keeps per bit-set size
const CONTEXT_CACHE_PER_SIZE: usize = 16;

/// Process-wide pool of scratch sets of one size
#[derive(Debug)]
pub struct BitSetPool {
    size: usize,
    max_concurrent: usize,
    in_flight: AtomicUsize,
    free: Mutex<Vec<ArrayBitSet>>,
}

impl BitSetPool {
    /// Creates a pool of `size`-bit sets with at most `max_concurrent` in flight
    pub fn new(size: usize, max_concurrent: usize) -> Self {
        Self {
            size,
            max_concurrent,
            in_flight: AtomicUsize::new(0),
            free: Mutex::new(Vec::new()),
        }
    }

    /// Bit-set size served by this pool
    pub fn size(&self) -> usize {
        self.size
    }

    /// Process-wide quota
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Sets currently borrowed across all threads
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Sets waiting on the shared free list
    pub fn free_count(&self) -> usize {
        self.free_list().len()
    }

    fn reserve(&self) -> PoolResult<()> {
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < self.max_concurrent).then_some(current + 1)
            })
            .map(|_| ())
            .map_err(|_| PoolError::exhausted("process", self.max_concurrent))
    }

    fn unreserve(&self, count: usize) {
        if count > 0 {
            self.in_flight.fetch_sub(count, Ordering::AcqRel);
        }
    }

    fn take_free(&self) -> Option<ArrayBitSet> {
        self.free_list().pop()
    }

    fn put_free(&self, set: ArrayBitSet) {
        let mut free = self.free_list();
        if free.len() < self.max_concurrent {
            free.push(set);
        }
    }

    fn free_list(&self) -> MutexGuard<'_, Vec<ArrayBitSet>> {
        // A panic while holding the lock cannot leave the list inconsistent
        match self.free.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Per-thread query handle
///
/// Not `Sync`: a context belongs to one thread at a time. Create one per
/// worker and pass it to every query that worker runs.
#[derive(Debug, Default)]
pub struct QueryContext {
    cache: RefCell<HashMap<usize, Vec<ArrayBitSet>>>,
    busy: Cell<bool>,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a query is currently running on this context
    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// Number of cached sets of `size` bits
    pub fn cached(&self, size: usize) -> usize {
        self.cache.borrow().get(&size).map_or(0, Vec::len)
    }

    /// Opens a scratch pool for one query.
    ///
    /// Fails with `SEAL_POOL_CONTEXT_BUSY` if another query is running on
    /// this context.
    pub fn scratch<'a>(&'a self, pool: &'a BitSetPool, limit: usize) -> PoolResult<ScratchPool<'a>> {
        if self.busy.replace(true) {
            return Err(PoolError::context_busy());
        }
        Ok(ScratchPool {
            pool,
            context: self,
            limit,
            outstanding: 0,
            borrowed_total: 0,
            released: false,
        })
    }

    fn take_cached(&self, size: usize) -> Option<ArrayBitSet> {
        self.cache.borrow_mut().get_mut(&size).and_then(Vec::pop)
    }

    /// Keeps `set` for this thread, or hands it back if the cache is full
    fn cache(&self, set: ArrayBitSet) -> Option<ArrayBitSet> {
        let mut cache = self.cache.borrow_mut();
        let bucket = cache.entry(set.size()).or_default();
        if bucket.len() < CONTEXT_CACHE_PER_SIZE {
            bucket.push(set);
            None
        } else {
            Some(set)
        }
    }
}

/// Scratch sets of one query
#[derive(Debug)]
pub struct ScratchPool<'a> {
    pool: &'a BitSetPool,
    context: &'a QueryContext,
    limit: usize,
    outstanding: usize,
    borrowed_total: usize,
    released: bool,
}

impl ScratchPool<'_> {
    /// Borrows a cleared set
    pub fn borrow(&mut self) -> PoolResult<ArrayBitSet> {
        if self.released {
            return Err(PoolError::released());
        }
        if self.outstanding >= self.limit {
            return Err(PoolError::exhausted("query", self.limit));
        }
        self.pool.reserve()?;
        self.outstanding += 1;
        self.borrowed_total += 1;

        let size = self.pool.size();
        let set = match self.context.take_cached(size).or_else(|| self.pool.take_free()) {
            Some(mut set) => {
                set.clear_all();
                set
            }
            None => ArrayBitSet::new(size),
        };
        Ok(set)
    }

    /// Returns a borrowed set
    pub fn give_back(&mut self, set: ArrayBitSet) -> PoolResult<()> {
        if self.released {
            return Err(PoolError::released());
        }
        if set.size() != self.pool.size() {
            return Err(PoolError::size_mismatch(self.pool.size(), set.size()));
        }
        if self.outstanding == 0 {
            return Err(PoolError::not_borrowed());
        }
        self.outstanding -= 1;
        self.pool.unreserve(1);
        if let Some(overflow) = self.context.cache(set) {
            self.pool.put_free(overflow);
        }
        Ok(())
    }

    /// Sets currently borrowed by this query
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Sets borrowed over the lifetime of this query
    pub fn borrowed_total(&self) -> usize {
        self.borrowed_total
    }

    /// Ends the query: sets never given back are written off and the context
    /// becomes available again.
    pub fn release(&mut self) -> PoolResult<()> {
        if self.released {
            return Err(PoolError::double_release());
        }
        self.released = true;
        self.pool.unreserve(self.outstanding);
        self.outstanding = 0;
        self.context.busy.set(false);
        Ok(())
    }
}

impl Drop for ScratchPool<'_> {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitset::PoolErrorCode;

    #[test]
    fn test_borrow_returns_cleared_set() {
        let pool = BitSetPool::new(100, 8);
        let context = QueryContext::new();

        let mut scratch = context.scratch(&pool, 4).unwrap();
        let mut set = scratch.borrow().unwrap();
        set.set(10);
        scratch.give_back(set).unwrap();

        let reused = scratch.borrow().unwrap();
        assert_eq!(reused.size(), 100);
        assert!(reused.is_empty());
    }

    #[test]
    fn test_query_quota() {
        let pool = BitSetPool::new(10, 8);
        let context = QueryContext::new();
        let mut scratch = context.scratch(&pool, 2).unwrap();

        let _a = scratch.borrow().unwrap();
        let _b = scratch.borrow().unwrap();
        let err = scratch.borrow().unwrap_err();
        assert_eq!(err.code(), PoolErrorCode::SealPoolExhausted);
    }

    #[test]
    fn test_process_quota_across_contexts() {
        let pool = BitSetPool::new(10, 1);
        let first = QueryContext::new();
        let second = QueryContext::new();

        let mut a = first.scratch(&pool, 4).unwrap();
        let _held = a.borrow().unwrap();

        let mut b = second.scratch(&pool, 4).unwrap();
        let err = b.borrow().unwrap_err();
        assert_eq!(err.code(), PoolErrorCode::SealPoolExhausted);

        a.release().unwrap();
        assert_eq!(pool.in_flight(), 0);
        assert!(b.borrow().is_ok());
    }

    #[test]
    fn test_release_is_single_use() {
        let pool = BitSetPool::new(10, 8);
        let context = QueryContext::new();
        let mut scratch = context.scratch(&pool, 2).unwrap();

        scratch.release().unwrap();
        assert_eq!(
            scratch.release().unwrap_err().code(),
            PoolErrorCode::SealPoolDoubleRelease
        );
        assert_eq!(
            scratch.borrow().unwrap_err().code(),
            PoolErrorCode::SealPoolReleased
        );
    }

    #[test]
    fn test_context_busy() {
        let pool = BitSetPool::new(10, 8);
        let context = QueryContext::new();

        let scratch = context.scratch(&pool, 2).unwrap();
        assert!(context.is_busy());
        assert_eq!(
            context.scratch(&pool, 2).unwrap_err().code(),
            PoolErrorCode::SealPoolContextBusy
        );

        drop(scratch);
        assert!(!context.is_busy());
        assert!(context.scratch(&pool, 2).is_ok());
    }

    #[test]
    fn test_context_caches_returned_sets() {
        let pool = BitSetPool::new(64, 8);
        let context = QueryContext::new();
        {
            let mut scratch = context.scratch(&pool, 2).unwrap();
            let set = scratch.borrow().unwrap();
            scratch.give_back(set).unwrap();
        }
        assert_eq!(context.cached(64), 1);
        assert_eq!(pool.in_flight(), 0);
    }

    #[test]
    fn test_size_mismatch() {
        let pool = BitSetPool::new(64, 8);
        let context = QueryContext::new();
        let mut scratch = context.scratch(&pool, 2).unwrap();
        let err = scratch.give_back(ArrayBitSet::new(8)).unwrap_err();
        assert_eq!(err.code(), PoolErrorCode::SealPoolSizeMismatch);
    }

    #[test]
    fn test_give_back_without_borrow() {
        let pool = BitSetPool::new(64, 8);
        let context = QueryContext::new();
        let mut scratch = context.scratch(&pool, 2).unwrap();
        let err = scratch.give_back(ArrayBitSet::new(64)).unwrap_err();
        assert_eq!(err.code(), PoolErrorCode::SealPoolNotBorrowed);
        assert_eq!(pool.in_flight(), 0);
        assert_eq!(context.cached(64), 0);

        let set = scratch.borrow().unwrap();
        scratch.give_back(set).unwrap();
        assert!(scratch.give_back(ArrayBitSet::new(64)).is_err());
        assert_eq!(scratch.outstanding(), 0);
    }

    #[test]
    fn test_unreturned_sets_are_written_off() {
        let pool = BitSetPool::new(10, 4);
        let context = QueryContext::new();
        let mut scratch = context.scratch(&pool, 4).unwrap();
        let _a = scratch.borrow().unwrap();
        let _b = scratch.borrow().unwrap();
        assert_eq!(pool.in_flight(), 2);
        scratch.release().unwrap();
        assert_eq!(pool.in_flight(), 0);
    }
}
