use std::{
    sync::{
        atomic::{AtomicI64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::{Condvar, Mutex, RwLock};

use crate::{
    block::{RowBlock, DEFAULT_BLOCK_CAPACITY},
    cursor::RowCursor,
    row::Row,
};

/// An atomic snapshot of the buffer's totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    pub total_rows: usize,
    pub total_bytes: usize,
    pub total_blocks: usize,
}

/// A growing, time-ordered chain of [`RowBlock`]s with age/size-bounded eviction of the head.
///
/// `append` is safe to call from a producer thread concurrently with readers walking
/// [`RowCursor`]s obtained from [`RowBuffer::cursor`]. GC only ever drops whole blocks, and never
/// the block `tail` currently points to.
pub struct RowBuffer {
    max_rows: usize,
    max_bytes: usize,
    max_age_ms: i64,
    block_capacity: usize,

    total_rows: AtomicUsize,
    total_bytes: AtomicUsize,
    total_blocks: AtomicUsize,
    row_seq: AtomicI64,

    head: RwLock<Arc<RowBlock>>,
    tail: RwLock<Arc<RowBlock>>,

    write_gate: Mutex<i64>,
    write_cv: Condvar,
}

impl RowBuffer {
    pub fn new(max_rows: usize, max_bytes: usize, max_age: Duration) -> Self {
        Self::with_block_capacity(max_rows, max_bytes, max_age, DEFAULT_BLOCK_CAPACITY)
    }

    pub fn with_block_capacity(
        max_rows: usize,
        max_bytes: usize,
        max_age: Duration,
        block_capacity: usize,
    ) -> Self {
        let first = RowBlock::new(block_capacity);
        RowBuffer {
            max_rows,
            max_bytes,
            max_age_ms: max_age.as_millis() as i64,
            block_capacity,
            total_rows: AtomicUsize::new(0),
            total_bytes: AtomicUsize::new(0),
            total_blocks: AtomicUsize::new(1),
            row_seq: AtomicI64::new(0),
            head: RwLock::new(first.clone()),
            tail: RwLock::new(first),
            write_gate: Mutex::new(0),
            write_cv: Condvar::new(),
        }
    }

    /// Appends `row`, evicting aged/oversized head blocks first. Infallible barring allocator
    /// exhaustion (an ordinary Rust allocation panic, not a recoverable error here).
    pub fn append(&self, row: Row) -> bool {
        self.advise_gc();

        loop {
            let tail = self.tail.read().clone();
            if tail.append(row.clone()) {
                break;
            }
            // Tail is full: allocate a new block, link it, and retry.
            let mut tail_guard = self.tail.write();
            // Re-check under the write lock: another thread may have already extended the chain.
            if Arc::ptr_eq(&tail, &tail_guard) {
                let new_block = RowBlock::new(self.block_capacity);
                tail_guard.set_next(new_block.clone());
                *tail_guard = new_block;
                self.total_blocks.fetch_add(1, Ordering::SeqCst);
            }
        }

        self.total_rows.fetch_add(1, Ordering::SeqCst);
        self.total_bytes.fetch_add(row.byte_size(), Ordering::SeqCst);

        let mut seq = self.write_gate.lock();
        *seq = self.row_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.write_cv.notify_all();
        true
    }

    /// Drops whole head blocks while any configured bound is exceeded, never moving past the
    /// block `tail` points to.
    fn advise_gc(&self) {
        loop {
            let head = self.head.read().clone();
            let tail = self.tail.read().clone();
            if Arc::ptr_eq(&head, &tail) {
                break;
            }

            let over_rows = self.total_rows.load(Ordering::SeqCst) >= self.max_rows;
            let over_bytes = self.total_bytes.load(Ordering::SeqCst) > self.max_bytes;
            let over_age = head.min_ts() < tail.max_ts() - self.max_age_ms;

            if !(over_rows || over_bytes || over_age) {
                break;
            }

            let Some(next) = head.next() else {
                break;
            };
            self.total_rows.fetch_sub(head.size(), Ordering::SeqCst);
            self.total_bytes.fetch_sub(head.byte_size(), Ordering::SeqCst);
            self.total_blocks.fetch_sub(1, Ordering::SeqCst);
            *self.head.write() = next;
        }
    }

    /// Blocks until an append has happened since this call started, or `max_wait` elapses.
    ///
    /// `max_wait == Duration::ZERO` waits indefinitely and always returns `true`.
    pub fn wait_for_write(&self, max_wait: Duration) -> bool {
        let mut seq = self.write_gate.lock();
        let observed = *seq;
        if max_wait.is_zero() {
            self.write_cv.wait_while(&mut seq, |s| *s == observed);
            true
        } else {
            let result = self
                .write_cv
                .wait_while_for(&mut seq, |s| *s == observed, max_wait);
            !result.timed_out()
        }
    }

    /// A fresh cursor positioned at the current head.
    pub fn cursor(&self) -> RowCursor {
        RowCursor::new(self.head.read().clone())
    }

    pub fn stats(&self) -> BufferStats {
        BufferStats {
            total_rows: self.total_rows.load(Ordering::SeqCst),
            total_bytes: self.total_bytes.load(Ordering::SeqCst),
            total_blocks: self.total_blocks.load(Ordering::SeqCst),
        }
    }
}
