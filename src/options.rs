//! Parses `CREATE VIRTUAL TABLE ... USING setab(...)` argument strings into a closed set of
//! engine options plus the declared column list.

use crate::{
    error::ConfigError,
    schema::{ColumnSpec, ColumnType, Schema},
};

pub const DEFAULT_BATCH_SIZE: i64 = 10_000;
pub const DEFAULT_WINDOW_SIZE_MS: i64 = 100_000;
pub const DEFAULT_LINGER_MS: i32 = 1_000;

/// One recognized `key = value` engine option. The set of keys is closed; anything else is a
/// column spec (or an error).
#[derive(Debug, Clone, PartialEq, Eq)]
enum TableOption {
    ListenPort(u16),
    NextHopService(String),
    BatchSize(i64),
    WindowSizeMs(i64),
}

impl TableOption {
    fn parse(key: &str, value: &str) -> Result<Self, ConfigError> {
        match key {
            "listen_port" => {
                let port: u16 = value.parse().map_err(|_| ConfigError::InvalidOptionValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "expected a 16-bit port number".to_string(),
                })?;
                Ok(TableOption::ListenPort(port))
            }
            "next_hop_service" => Ok(TableOption::NextHopService(trim_quotes(value).to_string())),
            "batch_size" => {
                let n: i64 = value.parse().map_err(|_| ConfigError::InvalidOptionValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "expected an integer".to_string(),
                })?;
                Ok(TableOption::BatchSize(n))
            }
            "window_size_ms" => {
                let n: i64 = value.parse().map_err(|_| ConfigError::InvalidOptionValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "expected an integer".to_string(),
                })?;
                Ok(TableOption::WindowSizeMs(n))
            }
            other => Err(ConfigError::UnknownOption(other.to_string())),
        }
    }
}

/// Strips at most one layer of matching leading/trailing single quotes, then surrounding
/// whitespace. Always indexes half-open ranges, never one-past-the-end.
fn trim_quotes(value: &str) -> &str {
    let trimmed = value.trim();
    let bytes = trimmed.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\'' {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

/// The fully parsed configuration of a `CREATE VIRTUAL TABLE ... USING setab(...)` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub listen_port: Option<u16>,
    pub next_hop_service: Option<String>,
    pub batch_size: i64,
    pub window_size_ms: i64,
    pub linger_ms: i32,
    pub schema: Schema,
}

impl TableConfig {
    pub fn parse(table_name: &str, args: &[&str]) -> Result<Self, ConfigError> {
        let mut listen_port = None;
        let mut next_hop_service = None;
        let mut batch_size = DEFAULT_BATCH_SIZE;
        let mut window_size_ms = DEFAULT_WINDOW_SIZE_MS;
        let mut columns = Vec::new();

        for raw in args {
            let arg = raw.trim().trim_end_matches(',').trim();
            if arg.is_empty() {
                continue;
            }
            if let Some(eq) = arg.find('=') {
                let key = arg[..eq].trim();
                let value = arg[eq + 1..].trim();
                match TableOption::parse(key, value)? {
                    TableOption::ListenPort(p) => listen_port = Some(p),
                    TableOption::NextHopService(uri) => next_hop_service = Some(uri),
                    TableOption::BatchSize(n) => batch_size = n,
                    TableOption::WindowSizeMs(n) => window_size_ms = n,
                }
            } else {
                columns.push(parse_column_spec(arg)?);
            }
        }

        if listen_port.is_none() && next_hop_service.is_none() {
            return Err(ConfigError::NeitherReadableNorWritable(table_name.to_string()));
        }

        Ok(TableConfig {
            listen_port,
            next_hop_service,
            batch_size,
            window_size_ms,
            linger_ms: DEFAULT_LINGER_MS,
            schema: Schema::new(columns),
        })
    }

    pub fn is_readable(&self) -> bool {
        self.listen_port.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.next_hop_service.is_some()
    }
}

fn parse_column_spec(arg: &str) -> Result<ColumnSpec, ConfigError> {
    let mut parts = arg.split_whitespace();
    let (Some(name), Some(ty), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ConfigError::MalformedColumnSpec(arg.to_string()));
    };
    Ok(ColumnSpec {
        name: name.to_string(),
        ty: ColumnType::parse(ty)?,
    })
}
