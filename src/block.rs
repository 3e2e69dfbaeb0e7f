use std::sync::Arc;

use parking_lot::RwLock;

use crate::row::Row;

/// The default number of rows a block holds before it becomes immutable (bar `next`).
pub const DEFAULT_BLOCK_CAPACITY: usize = 1000;

struct Inner {
    rows: Vec<Row>,
    capacity: usize,
    min_ts: i64,
    max_ts: i64,
    byte_size: usize,
    next: Option<Arc<RowBlock>>,
}

/// A fixed-capacity, append-only array of [`Row`]s plus a forward link to the next block.
///
/// One reader-writer lock covers the whole block (rows, min/max ts, byte size, and `next`).
/// Readers take the shared lock; the single writer that appends takes the exclusive lock. Once
/// `used == capacity` the block is immutable except for `next`, which lets a cursor park a
/// reference on a full block without blocking the writer that links a new one after it.
pub struct RowBlock {
    inner: RwLock<Inner>,
}

impl RowBlock {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(RowBlock {
            inner: RwLock::new(Inner {
                rows: Vec::with_capacity(capacity),
                capacity,
                min_ts: i64::MAX,
                max_ts: i64::MIN,
                byte_size: 0,
                next: None,
            }),
        })
    }

    /// Appends `row` if there is room. Returns `false` without mutating state if the block is
    /// full.
    pub fn append(&self, row: Row) -> bool {
        let mut inner = self.inner.write();
        if inner.rows.len() == inner.capacity {
            return false;
        }
        let ts = row.ts();
        if inner.rows.is_empty() {
            inner.min_ts = ts;
            inner.max_ts = ts;
        } else {
            inner.min_ts = inner.min_ts.min(ts);
            inner.max_ts = inner.max_ts.max(ts);
        }
        inner.byte_size += row.byte_size();
        inner.rows.push(row);
        true
    }

    pub fn size(&self) -> usize {
        self.inner.read().rows.len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().capacity
    }

    pub fn is_full(&self) -> bool {
        let inner = self.inner.read();
        inner.rows.len() == inner.capacity
    }

    pub fn byte_size(&self) -> usize {
        self.inner.read().byte_size
    }

    /// `(min_ts, max_ts)` over the rows currently stored. Meaningless on an empty block; callers
    /// only consult this once the block holds at least one row.
    pub fn min_max_ts(&self) -> (i64, i64) {
        let inner = self.inner.read();
        (inner.min_ts, inner.max_ts)
    }

    pub fn min_ts(&self) -> i64 {
        self.inner.read().min_ts
    }

    pub fn max_ts(&self) -> i64 {
        self.inner.read().max_ts
    }

    pub fn at(&self, index: usize) -> Option<Row> {
        self.inner.read().rows.get(index).cloned()
    }

    pub fn front(&self) -> Option<Row> {
        self.inner.read().rows.first().cloned()
    }

    pub fn back(&self) -> Option<Row> {
        self.inner.read().rows.last().cloned()
    }

    pub fn next(&self) -> Option<Arc<RowBlock>> {
        self.inner.read().next.clone()
    }

    pub fn set_next(&self, block: Arc<RowBlock>) {
        self.inner.write().next = Some(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::ColumnValue;

    fn row(id: i64, ts: i64, text: &str) -> Row {
        Row::new(
            id,
            vec![ColumnValue::Integer(ts), ColumnValue::Text(text.as_bytes().to_vec())],
        )
    }

    // Scenario: OneInsert
    #[test]
    fn one_insert() {
        let block = RowBlock::new(10);
        assert!(block.append(row(4, 10, "hello")));
        assert_eq!(block.size(), 1);
        assert_eq!(block.min_max_ts(), (10, 10));
        assert_eq!(block.front().unwrap().row_id, 4);
    }

    // Scenario: MaxInsert
    #[test]
    fn max_insert() {
        let block = RowBlock::new(10);
        for i in 0..11i64 {
            let id = i + 1;
            let ts = i * 2;
            let ok = block.append(row(id, ts, "x"));
            if i < 10 {
                assert!(ok, "append {id} should succeed");
            } else {
                assert!(!ok, "11th append should fail");
            }
        }
        assert_eq!(block.size(), 10);
        assert_eq!(block.min_max_ts(), (0, 18));
        assert_eq!(block.front().unwrap().row_id, 1);
        assert_eq!(block.back().unwrap().row_id, 10);
    }

    #[test]
    fn full_block_becomes_immutable_but_next_is_still_writable() {
        let block = RowBlock::new(1);
        assert!(block.append(row(1, 0, "a")));
        assert!(!block.append(row(2, 1, "b")));
        assert!(block.is_full());
        assert!(block.next().is_none());
        let successor = RowBlock::new(1);
        block.set_next(successor.clone());
        assert!(Arc::ptr_eq(&block.next().unwrap(), &successor));
    }
}
