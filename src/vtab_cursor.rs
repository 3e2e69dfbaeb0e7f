//! One batch of rows pulled through a [`VirtualTable`]: ts-seek on open, forward walk, and
//! window/row-budget termination.

use std::cell::RefCell;

use crate::{row::Row, table::VirtualTable};

/// Which comparison a `ts`-column constraint selected during `best_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekType {
    Gt,
    Ge,
}

/// A cursor's lifecycle: Fresh until `filter` is called, then Streaming until `eof` reports the
/// batch is over, then Done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fresh,
    Streaming,
    Done,
}

struct Inner {
    batch_start: i64,
    cursor_opened_ms: i64,
    current: Option<Row>,
    /// Whether the engine's column callback has consumed `current` yet. Only `column` ever sets
    /// this to `true`; nothing else mutates it as a side effect of reading `current`.
    consumed: bool,
    state: State,
}

/// `rusqlite::vtab::VTabCursor::eof` and `::column` take `&self`, yet `eof` here has a real side
/// effect (requeuing an unread row when a batch closes) and `column` marks the row consumed. The
/// mutable fields live behind a `RefCell` so every method can be `&self` regardless of which of
/// the trait's methods the engine calls through a shared or mutable borrow.
pub struct VirtualCursor {
    parent: VirtualTable,
    inner: RefCell<Inner>,
}

impl VirtualCursor {
    pub fn new(parent: VirtualTable) -> Self {
        VirtualCursor {
            parent,
            inner: RefCell::new(Inner {
                batch_start: 0,
                cursor_opened_ms: 0,
                current: None,
                consumed: true,
                state: State::Fresh,
            }),
        }
    }

    /// Opens the batch. `idx_num == 0` means no usable `ts` constraint was planned; otherwise
    /// `args[0]` is the ts to seek to, and `idx_num`'s low bits select `Gt` vs `Ge`.
    pub fn filter(&self, idx_num: i32, args: &[i64]) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.cursor_opened_ms = self.parent.clock().now_ms();
            inner.state = State::Streaming;
        }
        let batch_start = if idx_num == 0 {
            self.next_row()
        } else {
            let start_ts = args.first().copied().unwrap_or(0);
            let seek_type = if idx_num & 0b01 != 0 {
                SeekType::Gt
            } else {
                SeekType::Ge
            };
            self.seek_until_time(start_ts, seek_type)
        };
        self.inner.borrow_mut().batch_start = batch_start;
        log::trace!(
            "cursor on '{}' filtered (idx_num={idx_num}, batch_start={batch_start})",
            self.parent.name(),
        );
    }

    /// Blocks (via the parent's blocking receive) until a VALID row arrives, stores it, and
    /// returns its id.
    fn next_row(&self) -> i64 {
        loop {
            let row = self.parent.read_row(false);
            if row.is_valid() {
                let id = row.row_id;
                let mut inner = self.inner.borrow_mut();
                inner.current = Some(row);
                inner.consumed = false;
                return id;
            }
        }
    }

    fn seek_until_time(&self, epoch: i64, seek_type: SeekType) -> i64 {
        loop {
            let id = self.next_row();
            let ts = self
                .inner
                .borrow()
                .current
                .as_ref()
                .expect("next_row always sets current")
                .ts();
            let satisfied = match seek_type {
                SeekType::Ge => ts >= epoch,
                SeekType::Gt => ts > epoch,
            };
            if satisfied {
                return id;
            }
        }
    }

    /// Advances to the next row of the batch.
    pub fn next(&self) {
        self.next_row();
    }

    /// Returns whether the batch has ended. If it has and the current row was never consumed by
    /// the engine's column callback, requeues it so the next cursor sees it first -- this avoids
    /// silently dropping a row fetched right as the window closed.
    pub fn eof(&self) -> bool {
        let row_id = {
            let Some(current) = &self.inner.borrow().current else {
                return true;
            };
            current.row_id
        };
        let (batch_start, cursor_opened_ms) = {
            let inner = self.inner.borrow();
            (inner.batch_start, inner.cursor_opened_ms)
        };
        let done = self.parent.batch_consumed(row_id, batch_start, cursor_opened_ms);
        if done {
            let mut inner = self.inner.borrow_mut();
            inner.state = State::Done;
            if !inner.consumed {
                if let Some(row) = inner.current.take() {
                    self.parent.requeue(row);
                }
            }
        }
        done
    }

    pub fn rowid(&self) -> i64 {
        self.inner
            .borrow()
            .current
            .as_ref()
            .map(|r| r.row_id)
            .unwrap_or(-1)
    }

    /// The `n`-th column of the current row, cloned out from under the refcell. `None` only for
    /// an out-of-range index; callers hold `n < schema.len()` as an invariant from the engine's
    /// column count.
    pub fn column(&self, n: usize) -> Option<crate::row::ColumnValue> {
        let mut inner = self.inner.borrow_mut();
        inner.consumed = true;
        inner.current.as_ref().and_then(|r| r.column(n)).cloned()
    }

    #[cfg(test)]
    fn is_streaming(&self) -> bool {
        self.inner.borrow().state == State::Streaming
    }

    #[cfg(test)]
    fn is_consumed(&self) -> bool {
        self.inner.borrow().consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::TestClock,
        row::ColumnValue,
        schema::{ColumnSpec, ColumnType, Schema},
    };
    use std::sync::Arc;

    fn schema() -> Schema {
        Schema::new(vec![ColumnSpec {
            name: "value".to_string(),
            ty: ColumnType::Text,
        }])
    }

    #[test]
    fn fresh_cursor_reports_eof_with_no_current_row() {
        let table = VirtualTable::for_test("t", schema(), Arc::new(TestClock::new(0)));
        let cursor = VirtualCursor::new(table);
        assert!(cursor.eof());
    }

    #[test]
    fn filter_transitions_to_streaming() {
        let table = VirtualTable::for_test("t", schema(), Arc::new(TestClock::new(0)));
        table.requeue(Row::new(
            1,
            vec![ColumnValue::Integer(10), ColumnValue::Text(b"a".to_vec())],
        ));
        let cursor = VirtualCursor::new(table);
        cursor.filter(0, &[]);
        assert!(cursor.is_streaming());
        assert_eq!(cursor.rowid(), 1);
    }

    #[test]
    fn unconsumed_row_is_requeued_when_the_batch_ends() {
        let clock = Arc::new(TestClock::new(0));
        let table = VirtualTable::for_test("t", schema(), clock.clone());
        table.requeue(Row::new(
            1,
            vec![ColumnValue::Integer(10), ColumnValue::Text(b"a".to_vec())],
        ));
        let cursor = VirtualCursor::new(table.clone());
        cursor.filter(0, &[]);
        // Force the window to have elapsed without the engine ever reading a column.
        clock.set(table.window_size_ms());
        assert!(cursor.eof());
        let requeued = table.read_row(true);
        assert_eq!(requeued.row_id, 1);
    }

    #[test]
    fn column_marks_the_row_consumed() {
        let table = VirtualTable::for_test("t", schema(), Arc::new(TestClock::new(0)));
        table.requeue(Row::new(
            1,
            vec![ColumnValue::Integer(10), ColumnValue::Text(b"a".to_vec())],
        ));
        let cursor = VirtualCursor::new(table);
        cursor.filter(0, &[]);
        assert_eq!(cursor.column(0), Some(ColumnValue::Integer(10)));
        assert!(cursor.is_consumed());
    }
}
