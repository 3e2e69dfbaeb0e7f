//! Trait implementations bridging `rusqlite::vtab`'s callback protocol to [`VirtualTable`] and
//! [`VirtualCursor`]. `rusqlite::vtab` already owns the raw `sqlite3_vtab`/`sqlite3_vtab_cursor`
//! C structs and the vtable-of-function-pointers the engine's ABI requires (`Module`); we never
//! construct either by hand, we only implement the safe traits it asks for.

use std::{os::raw::c_int, sync::Arc};

use rusqlite::{
    vtab::{Context, CreateVTab, IndexInfo, UpdateVTab, VTab, VTabConnection, VTabCursor, Values},
    Connection,
};

use crate::{
    error::{Error, SemanticError},
    registry::Registry,
    row::ColumnValue,
    schema::ColumnType,
    table::VirtualTable,
    vtab_cursor::VirtualCursor,
};

/// Shared state every `connect`/`create` call needs: the table directory, and the transport
/// context sockets are opened against.
pub struct Aux {
    pub registry: Arc<Registry>,
    pub zmq_context: Arc<zmq::Context>,
}

/// Parses the raw `argv[3..]` byte-string arguments `rusqlite` hands `connect`/`create` into
/// owned UTF-8 strings, failing the call with a configuration error on invalid UTF-8.
fn decode_args(args: &[&[u8]]) -> rusqlite::Result<Vec<String>> {
    args.iter()
        .skip(3)
        .map(|raw| {
            std::str::from_utf8(raw)
                .map(|s| s.trim().trim_end_matches(',').trim().to_string())
                .map_err(|_| {
                    rusqlite::Error::from(Error::Configuration(
                        crate::error::ConfigError::MalformedColumnSpec(
                            String::from_utf8_lossy(raw).to_string(),
                        ),
                    ))
                })
        })
        .collect()
}

fn table_name(args: &[&[u8]]) -> rusqlite::Result<&str> {
    args.get(2)
        .and_then(|b| std::str::from_utf8(b).ok())
        .ok_or_else(|| {
            rusqlite::Error::from(Error::Configuration(
                crate::error::ConfigError::MalformedColumnSpec("<missing table name>".to_string()),
            ))
        })
}

unsafe impl<'vtab> VTab<'vtab> for VirtualTable {
    type Aux = Aux;
    type Cursor = VirtualCursor;

    fn connect(
        _db: &mut VTabConnection,
        aux: Option<&Self::Aux>,
        args: &[&[u8]],
    ) -> rusqlite::Result<(String, Self)> {
        let aux = aux.expect("the setab module is always registered with Aux");
        let name = table_name(args)?;
        let owned_args = decode_args(args)?;
        let refs: Vec<&str> = owned_args.iter().map(String::as_str).collect();
        VirtualTable::connect(aux.registry.clone(), &aux.zmq_context, name, &refs)
            .map_err(rusqlite::Error::from)
    }

    fn best_index(&self, info: &mut IndexInfo) -> rusqlite::Result<()> {
        VirtualTable::best_index(self, info)
    }

    fn open(&'vtab self) -> rusqlite::Result<Self::Cursor> {
        if self.is_write_only() {
            return Err(Error::Semantic(SemanticError::WriteOnly(self.name())).into());
        }
        Ok(VirtualCursor::new(self.clone()))
    }

    fn rename(&self, new_name: &str) -> rusqlite::Result<()> {
        VirtualTable::rename(self, new_name).map_err(rusqlite::Error::from)
    }
}

impl<'vtab> CreateVTab<'vtab> for VirtualTable {
    const KIND: rusqlite::vtab::VTabKind = rusqlite::vtab::VTabKind::Default;

    fn create(
        db: &mut VTabConnection,
        aux: Option<&Self::Aux>,
        args: &[&[u8]],
    ) -> rusqlite::Result<(String, Self)> {
        <Self as VTab>::connect(db, aux, args)
    }

    fn destroy(&self) -> rusqlite::Result<()> {
        VirtualTable::destroy(self);
        Ok(())
    }
}

impl<'vtab> UpdateVTab<'vtab> for VirtualTable {
    fn delete(&mut self, _arg: rusqlite::types::ValueRef<'_>) -> rusqlite::Result<()> {
        Err(Error::Semantic(SemanticError::NotSupported(self.name())).into())
    }

    fn insert(&mut self, args: &Values<'_>) -> rusqlite::Result<i64> {
        // `args` is `[new_rowid_or_null, col0, col1, ...]` in rusqlite's xUpdate convention;
        // column 0 of our schema (`ts`) lines up with `args.get(1)`.
        let mut values = Vec::with_capacity(self.schema().len());
        for (i, spec) in self.schema().columns().iter().enumerate() {
            let value: rusqlite::types::Value = args.get(i + 1)?;
            let column = match (spec.ty, value) {
                (ColumnType::Integer, rusqlite::types::Value::Integer(v)) => {
                    ColumnValue::Integer(v)
                }
                (ColumnType::Text, rusqlite::types::Value::Text(s)) => {
                    ColumnValue::Text(s.into_bytes())
                }
                (ColumnType::Text, rusqlite::types::Value::Blob(b)) => ColumnValue::Text(b),
                _ => {
                    return Err(
                        Error::Configuration(crate::error::ConfigError::UnknownColumnType(
                            spec.name.clone(),
                        ))
                        .into(),
                    )
                }
            };
            values.push(column);
        }
        self.write(&values).map_err(rusqlite::Error::from)?;
        Ok(0)
    }

    fn update(&mut self, _args: &Values<'_>) -> rusqlite::Result<()> {
        Err(Error::Semantic(SemanticError::NotSupported(self.name())).into())
    }
}

impl VTabCursor for VirtualCursor {
    fn filter(
        &mut self,
        idx_num: c_int,
        _idx_str: Option<&str>,
        args: &Values<'_>,
    ) -> rusqlite::Result<()> {
        let mut ints = Vec::with_capacity(args.len());
        for i in 0..args.len() {
            ints.push(args.get::<i64>(i).unwrap_or(0));
        }
        VirtualCursor::filter(self, idx_num, &ints);
        Ok(())
    }

    fn next(&mut self) -> rusqlite::Result<()> {
        VirtualCursor::next(self);
        Ok(())
    }

    fn eof(&self) -> bool {
        VirtualCursor::eof(self)
    }

    fn column(&self, ctx: &mut Context, i: c_int) -> rusqlite::Result<()> {
        match VirtualCursor::column(self, i as usize) {
            Some(ColumnValue::Integer(v)) => ctx.set_result(&v),
            Some(ColumnValue::Text(bytes)) => ctx.set_result(&bytes),
            None => ctx.set_result(&rusqlite::types::Null),
        }
    }

    fn rowid(&self) -> rusqlite::Result<i64> {
        Ok(VirtualCursor::rowid(self))
    }
}

/// Registers the `setab` virtual table module on `conn`, wiring every future
/// `CREATE VIRTUAL TABLE ... USING setab(...)` in this connection to `registry` and `zmq_context`.
pub fn register_module(
    conn: &Connection,
    registry: Arc<Registry>,
    zmq_context: Arc<zmq::Context>,
) -> rusqlite::Result<()> {
    let module = rusqlite::vtab::update_module::<VirtualTable>();
    conn.create_module(
        "setab",
        module,
        Some(Aux {
            registry,
            zmq_context,
        }),
    )
}
