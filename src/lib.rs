//! # About
//!
//! `setab` embeds SQL as a query language over streams of timestamped records. Rows arrive and
//! leave over point-to-point ZeroMQ PUSH/PULL sockets; this crate supplies a SQLite virtual table
//! module (`CREATE VIRTUAL TABLE ... USING setab(...)`) so ordinary `SELECT`/`INSERT` statements
//! can read and write those streams.
//!
//! The moving parts:
//! - [`buffer::RowBuffer`] / [`block::RowBlock`] / [`cursor::RowCursor`]: a time-ordered,
//!   concurrently readable chain of row blocks with age/size-bounded eviction.
//! - [`stream_time::StreamTime`]: a percentile estimate of the stream clock from a histogram of
//!   observed-timestamp-vs-wall-clock deltas.
//! - [`table::VirtualTable`] / [`vtab_cursor::VirtualCursor`] / [`adapter`]: the virtual-table
//!   plumbing, implemented against [`rusqlite::vtab`].

mod adapter;
mod block;
mod buffer;
mod clock;
mod codec;
mod cursor;
mod error;
mod options;
mod registry;
mod row;
mod schema;
mod stream_time;
mod table;
mod transport;
mod vtab_cursor;

pub use crate::{
    adapter::{register_module, Aux},
    block::{RowBlock, DEFAULT_BLOCK_CAPACITY},
    buffer::{BufferStats, RowBuffer},
    clock::{Clock, SystemClock, TestClock},
    cursor::RowCursor,
    error::{CodecError, ConfigError, Error, SemanticError, TransportError},
    options::TableConfig,
    registry::Registry,
    row::{ColumnValue, Row},
    schema::{ColumnSpec, ColumnType, Schema},
    stream_time::{StreamTime, Window},
    table::VirtualTable,
    vtab_cursor::VirtualCursor,
};
