use std::sync::Arc;

use crate::{block::RowBlock, row::Row};

/// A read position `(block, offset)` over a [`RowBuffer`](crate::buffer::RowBuffer)'s block
/// chain. Supports forward walk and seek-by-time. Cheap to clone the underlying block reference;
/// cursors do not share offsets with each other.
pub struct RowCursor {
    block: Arc<RowBlock>,
    offset: usize,
}

impl RowCursor {
    pub(crate) fn new(block: Arc<RowBlock>) -> Self {
        RowCursor { block, offset: 0 }
    }

    /// The row at the current position, or `None` if the cursor has run off the end of a block
    /// that has no (yet) successor.
    pub fn get(&self) -> Option<Row> {
        self.block.at(self.offset)
    }

    /// Advances the cursor by one row. Returns `false` if there is currently no next row to
    /// advance to (the block is not yet full, or is full with no linked successor yet).
    pub fn next(&mut self) -> bool {
        let used = self.block.size();
        if used > 0 && self.offset + 1 <= used - 1 {
            self.offset += 1;
            return true;
        }
        if !self.block.is_full() {
            return false;
        }
        match self.block.next() {
            Some(next_block) => {
                self.block = next_block;
                self.offset = 0;
                true
            }
            None => false,
        }
    }

    /// Skips whole blocks that predate `min_ts`, then walks row by row until the first row with
    /// `ts >= min_ts`. Returns `false` if the chain is exhausted before such a row is found.
    pub fn seek(&mut self, min_ts: i64) -> bool {
        self.seek_impl(min_ts, false)
    }

    /// As [`RowCursor::seek`], but positions past rows with `ts == min_ts` too (the planner's
    /// `ts >` case).
    pub fn seek_gt(&mut self, min_ts: i64) -> bool {
        self.seek_impl(min_ts, true)
    }

    fn seek_impl(&mut self, min_ts: i64, strictly_greater: bool) -> bool {
        loop {
            if self.block.size() > 0 && self.block.max_ts() >= min_ts {
                break;
            }
            match self.block.next() {
                Some(next_block) => {
                    self.block = next_block;
                    self.offset = 0;
                }
                None => return false,
            }
        }

        loop {
            let Some(row) = self.get() else {
                if !self.next() {
                    return false;
                }
                continue;
            };
            let satisfied = if strictly_greater {
                row.ts() > min_ts
            } else {
                row.ts() >= min_ts
            };
            if satisfied {
                return true;
            }
            if !self.next() {
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{buffer::RowBuffer, row::ColumnValue};
    use std::time::Duration;

    fn row(id: i64, ts: i64) -> Row {
        Row::new(id, vec![ColumnValue::Integer(ts)])
    }

    #[test]
    fn next_walks_within_and_across_blocks() {
        let buffer = RowBuffer::with_block_capacity(1000, 1_000_000, Duration::from_secs(3600), 3);
        for i in 0..7i64 {
            buffer.append(row(i + 1, i));
        }
        let mut cursor = buffer.cursor();
        let mut seen = Vec::new();
        loop {
            let Some(r) = cursor.get() else { break };
            seen.push(r.row_id);
            if !cursor.next() {
                break;
            }
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn seek_gt_skips_the_exact_match() {
        let buffer = RowBuffer::with_block_capacity(1000, 1_000_000, Duration::from_secs(3600), 10);
        for i in 0..10i64 {
            buffer.append(row(i + 1, i));
        }
        let mut cursor = buffer.cursor();
        assert!(cursor.seek_gt(5));
        assert_eq!(cursor.get().unwrap().ts(), 6);
    }

    #[test]
    fn seek_past_the_end_of_the_chain_fails() {
        let buffer = RowBuffer::with_block_capacity(1000, 1_000_000, Duration::from_secs(3600), 10);
        for i in 0..5i64 {
            buffer.append(row(i + 1, i));
        }
        let mut cursor = buffer.cursor();
        assert!(!cursor.seek(100));
    }
}
