use thiserror::Error as ThisError;

/// Errors that can arise while configuring, running, or tearing down a virtual table.
///
/// Grouped by the four kinds the design distinguishes: configuration errors fail
/// `CREATE VIRTUAL TABLE` outright, transport and parse errors are mostly absorbed by the
/// cursor's retry loop, and semantic errors reject a disallowed operation (`UPDATE`, `DELETE`,
/// writing to a read-only table, reading from a write-only one).
#[derive(Debug, ThisError)]
pub enum Error {
    /// The `CREATE VIRTUAL TABLE` argument list could not be turned into a table configuration.
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    /// Failure setting up or using the PUSH/PULL transport.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Failure decoding a row off the wire.
    #[error(transparent)]
    Parse(#[from] CodecError),
    /// An operation not permitted by this table's read/write classification.
    #[error(transparent)]
    Semantic(#[from] SemanticError),
}

/// Errors raised while parsing `CREATE VIRTUAL TABLE ... USING setab(...)` arguments.
#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("unrecognized engine option key '{0}'")]
    UnknownOption(String),
    #[error("option '{key}' has an invalid value '{value}': {reason}")]
    InvalidOptionValue {
        key: String,
        value: String,
        reason: String,
    },
    #[error("column spec '{0}' is not of the form '<name> <INTEGER|TEXT>'")]
    MalformedColumnSpec(String),
    #[error("unknown column type '{0}', expected INTEGER or TEXT")]
    UnknownColumnType(String),
    #[error(
        "table '{0}' configures neither listen_port nor next_hop_service; it would be able \
        to neither read nor write"
    )]
    NeitherReadableNorWritable(String),
}

/// Errors raised setting up or using the network transport.
#[derive(Debug, ThisError)]
pub enum TransportError {
    #[error("failed to create ZeroMQ context: {0}")]
    Context(#[source] zmq::Error),
    #[error("failed to bind PULL socket to 'tcp://*:{port}': {source}")]
    Bind { port: u16, source: zmq::Error },
    #[error("failed to connect PUSH socket to '{uri}': {source}")]
    Connect { uri: String, source: zmq::Error },
    #[error("failed to set socket option {option}: {source}")]
    SetSockOpt {
        option: &'static str,
        source: zmq::Error,
    },
    #[error("send on PUSH socket failed: {0}")]
    SendFailed(#[source] zmq::Error),
    #[error("receive on PULL socket failed: {0}")]
    ReceiveFailed(#[source] zmq::Error),
}

/// Errors raised decoding a record-separator-framed row payload.
#[derive(Debug, ThisError)]
pub enum CodecError {
    #[error("expected {expected} columns, found {found}")]
    ColumnCountMismatch { expected: usize, found: usize },
    #[error("column {index} ('{name}') is not a valid base-10 integer")]
    InvalidInteger { index: usize, name: String },
}

/// Errors raised for operations this table's read/write classification disallows.
#[derive(Debug, ThisError)]
pub enum SemanticError {
    #[error("INSERT is not supported on read-only table '{0}'")]
    ReadOnly(String),
    #[error("cursors cannot be opened on write-only table '{0}'")]
    WriteOnly(String),
    #[error("UPDATE and DELETE are not supported on virtual table '{0}'")]
    NotSupported(String),
}

/// Bridges our error taxonomy into the error type `rusqlite::vtab` trait methods must return.
impl From<Error> for rusqlite::Error {
    fn from(err: Error) -> Self {
        rusqlite::Error::ModuleError(err.to_string())
    }
}
