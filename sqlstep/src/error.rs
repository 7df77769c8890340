/// Error type for the sqlstep crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The configuration did not name a database.
    #[error("database must have a name")]
    MissingName,
    /// The configured backend kind is not one of `mysql`, `postgres`, `sqlite3`.
    #[error("unknown db engine: {0}")]
    UnknownKind(String),
    /// An operation that needs a live connection ran before `open()`.
    #[error("connection is not open")]
    NotOpen,
    #[error("{0}")]
    Config(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "sqlite")]
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),
    #[cfg(feature = "mysql")]
    #[error("{0}")]
    Mysql(String),
    #[cfg(feature = "postgres")]
    #[error("{0}")]
    Postgres(#[from] postgres::Error),
    /// A statement inside a migration script failed.
    #[error("error in statement:\nStmt: {stmt}\nErr: {source}")]
    Statement {
        stmt: String,
        #[source]
        source: Box<Error>,
    },
    /// The ledger and the migration file list disagree at some position.
    #[error(
        "migrations are out of sync: ledger entry \"{ledger}\" does not match \
         migration file {file} (file missing, or created after later migrations ran)"
    )]
    OutOfSync { ledger: String, file: String },
    /// A rollback reached a migration whose script has no down half.
    #[error("tried to rollback migration without down: {0}")]
    MissingDown(String),
}

#[cfg(feature = "mysql")]
impl From<mysql::Error> for Error {
    fn from(value: mysql::Error) -> Self {
        Self::Mysql(value.to_string())
    }
}
