//! A single virtual table: its configuration, its transport sockets, and the row-level
//! operations the adapter calls into.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

use parking_lot::{Mutex, RwLock};
use rusqlite::vtab::IndexInfo;

use crate::{
    clock::Clock,
    codec,
    error::{ConfigError, Error, SemanticError},
    options::TableConfig,
    registry::Registry,
    row::Row,
    schema::Schema,
    transport,
};

/// A single table's transport endpoint: a read socket (PULL), a write socket (PUSH), both, or
/// (if misconfigured) neither -- the latter is rejected during `connect`.
struct Sockets {
    read: Option<Mutex<zmq::Socket>>,
    write: Option<Mutex<zmq::Socket>>,
}

struct TableInner {
    registry: Option<Arc<Registry>>,
    name: RwLock<String>,
    schema: Schema,
    clock: Arc<dyn Clock>,
    sockets: Sockets,
    listen_port: Option<u16>,
    next_hop_service: Option<String>,
    batch_size: i64,
    window_size_ms: i64,
    current_row_id: AtomicI64,
    requeued: Mutex<VecDeque<Row>>,
}

/// A cheap-to-clone handle onto a table's shared state.
///
/// `rusqlite::vtab::VTab::open` only ever gets `&'vtab self`, never an owned value, yet every
/// cursor it spawns needs its own strong reference to the table to outlive that borrow. Wrapping
/// the real state in one `Arc` and making `VirtualTable` itself `Clone` sidesteps that without
/// unsafe lifetime extension: `open` just clones the handle.
#[derive(Clone)]
pub struct VirtualTable(Arc<TableInner>);

impl VirtualTable {
    /// Parses `args`, opens the configured sockets, declares the DDL via `schema.declare_ddl`,
    /// and registers the table in `registry` under `name`. Returns the declared DDL alongside the
    /// table so the caller (the adapter's `connect`/`create`) can hand both back to the engine.
    pub fn connect(
        registry: Arc<Registry>,
        ctx: &zmq::Context,
        name: &str,
        args: &[&str],
    ) -> Result<(String, VirtualTable), Error> {
        Self::connect_with_clock(registry, ctx, name, args, Arc::new(crate::clock::SystemClock))
    }

    pub fn connect_with_clock(
        registry: Arc<Registry>,
        ctx: &zmq::Context,
        name: &str,
        args: &[&str],
        clock: Arc<dyn Clock>,
    ) -> Result<(String, VirtualTable), Error> {
        let config = TableConfig::parse(name, args).map_err(Error::Configuration)?;

        let read = config
            .listen_port
            .map(|port| transport::bind_pull(ctx, port, config.linger_ms).map(Mutex::new))
            .transpose()
            .map_err(Error::Transport)?;
        let write = config
            .next_hop_service
            .as_deref()
            .map(|uri| transport::connect_push(ctx, uri, config.linger_ms).map(Mutex::new))
            .transpose()
            .map_err(Error::Transport)?;

        let ddl = config.schema.declare_ddl();
        let table = VirtualTable(Arc::new(TableInner {
            registry: Some(registry.clone()),
            name: RwLock::new(name.to_string()),
            schema: config.schema,
            clock,
            sockets: Sockets { read, write },
            listen_port: config.listen_port,
            next_hop_service: config.next_hop_service,
            batch_size: config.batch_size,
            window_size_ms: config.window_size_ms,
            current_row_id: AtomicI64::new(0),
            requeued: Mutex::new(VecDeque::new()),
        }));
        registry.add(name.to_string(), table.clone());
        log::info!("virtual table '{name}' created ({ddl})");
        Ok((ddl, table))
    }

    /// A transport-less table for tests that only exercise schema/registry plumbing.
    #[cfg(test)]
    pub fn for_test(name: &str, schema: Schema, clock: Arc<dyn Clock>) -> Self {
        VirtualTable(Arc::new(TableInner {
            registry: None,
            name: RwLock::new(name.to_string()),
            schema,
            clock,
            sockets: Sockets {
                read: None,
                write: None,
            },
            listen_port: Some(0),
            next_hop_service: None,
            batch_size: crate::options::DEFAULT_BATCH_SIZE,
            window_size_ms: crate::options::DEFAULT_WINDOW_SIZE_MS,
            current_row_id: AtomicI64::new(0),
            requeued: Mutex::new(VecDeque::new()),
        }))
    }

    pub fn name(&self) -> String {
        self.0.name.read().clone()
    }

    pub fn schema(&self) -> &Schema {
        &self.0.schema
    }

    pub fn is_read_only(&self) -> bool {
        self.0.listen_port.is_some() && self.0.next_hop_service.is_none()
    }

    pub fn is_write_only(&self) -> bool {
        self.0.next_hop_service.is_some() && self.0.listen_port.is_none()
    }

    pub fn batch_size(&self) -> i64 {
        self.0.batch_size
    }

    pub fn window_size_ms(&self) -> i64 {
        self.0.window_size_ms
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.0.clock
    }

    /// Pops a previously requeued row if any; otherwise assigns the next id and receives a
    /// fresh message. Receive and parse failures are absorbed into an invalid [`Row`] carrying
    /// just the new id, so the cursor's retry loop can move on.
    pub fn read_row(&self, dont_wait: bool) -> Row {
        if let Some(row) = self.0.requeued.lock().pop_front() {
            return row;
        }

        let row_id = self.0.current_row_id.fetch_add(1, Ordering::SeqCst) + 1;
        let Some(read) = &self.0.sockets.read else {
            return Row::invalid(row_id);
        };
        let socket = read.lock();
        let payload = match transport::recv(&socket, dont_wait) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::warn!("receive failed on table '{}': {err}", self.name());
                return Row::invalid(row_id);
            }
        };
        match codec::parse(&payload, &self.0.schema) {
            Ok(columns) => Row::new(row_id, columns),
            Err(err) => {
                log::warn!("parse failed on table '{}': {err}", self.name());
                Row::invalid(row_id)
            }
        }
    }

    /// Pushes `row` to the front of the FIFO so the next `read_row` returns it again.
    pub fn requeue(&self, row: Row) {
        self.0.requeued.lock().push_front(row);
    }

    pub fn write(&self, values: &[crate::row::ColumnValue]) -> Result<(), Error> {
        let Some(write) = &self.0.sockets.write else {
            return Err(Error::Semantic(SemanticError::ReadOnly(self.name())));
        };
        let payload = codec::encode(values);
        let socket = write.lock();
        transport::send(&socket, &payload).map_err(Error::Transport)
    }

    /// Examines the usable constraints on column 0 (`ts`) and publishes a planner hint.
    ///
    /// `idx_num` bit 0 = a `ts >` constraint was chosen, bit 1 = `ts >=`. Cost drops by 100 per
    /// constraint consumed; a single ascending `ORDER BY` is marked consumed too.
    pub fn best_index(&self, info: &mut IndexInfo) -> rusqlite::Result<()> {
        let mut idx_num = 0i32;
        let mut constraints_used = 0i32;

        for (constraint, mut usage) in info.constraint_and_usage() {
            if constraint.column() != 0 || !constraint.is_usable() {
                continue;
            }
            match constraint.operator() {
                rusqlite::vtab::IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_GT => {
                    idx_num |= 0b01;
                    usage.set_argv_index(1);
                    usage.set_omit(true);
                    constraints_used += 1;
                }
                rusqlite::vtab::IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_GE => {
                    idx_num |= 0b10;
                    usage.set_argv_index(1);
                    usage.set_omit(true);
                    constraints_used += 1;
                }
                _ => {}
            }
        }

        let order_bys = info.order_bys();
        let single_ascending = order_bys.len() == 1
            && order_bys
                .iter()
                .next()
                .is_some_and(|o| o.column() == 0 && !o.is_order_by_desc());
        if single_ascending {
            info.set_order_by_consumed(true);
        }

        info.set_idx_num(idx_num);
        info.set_estimated_cost(1000.0 - 100.0 * constraints_used as f64);
        info.set_estimated_rows(10);
        Ok(())
    }

    /// `true` iff the batch window has elapsed or the row budget is exhausted.
    pub fn batch_consumed(&self, row_id: i64, batch_start: i64, cursor_opened_ms: i64) -> bool {
        let now_ms = self.0.clock.now_ms();
        now_ms - cursor_opened_ms >= self.0.window_size_ms
            || row_id - batch_start >= self.0.batch_size
    }

    pub fn rename(&self, new_name: &str) -> Result<(), Error> {
        let old_name = self.name();
        let Some(registry) = &self.0.registry else {
            return Err(Error::Configuration(ConfigError::UnknownOption(
                "rename on a table with no registry".to_string(),
            )));
        };
        if !registry.rename(&old_name, new_name) {
            return Err(Error::Configuration(ConfigError::UnknownOption(format!(
                "table '{old_name}' not found in registry"
            ))));
        }
        *self.0.name.write() = new_name.to_string();
        log::info!("virtual table '{old_name}' renamed to '{new_name}'");
        Ok(())
    }

    pub fn destroy(&self) {
        let name = self.name();
        if let Some(registry) = &self.0.registry {
            registry.remove(&name);
        }
        log::info!("virtual table '{name}' destroyed");
    }
}
