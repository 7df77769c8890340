//! Backend engines: one capability set over heterogeneous SQL dialects.

use std::path::Path;

use crate::config::DbConfig;
use crate::error::Error;

#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "mysql")]
pub use self::mysql::MysqlEngine;
#[cfg(feature = "postgres")]
pub use self::postgres::PostgresEngine;
#[cfg(feature = "sqlite")]
pub use self::sqlite::Sqlite3Engine;

/// Name of the ledger table recording applied migration identifiers.
pub const MIGRATION_TABLE: &str = "tracked_migrations";

pub(crate) const SQL_CREATE_LEDGER: &str =
    "CREATE TABLE IF NOT EXISTS tracked_migrations (migration varchar(255) NOT NULL)";
pub(crate) const SQL_ADD_MIGRATION: &str =
    "INSERT INTO tracked_migrations (migration) VALUES (?)";
pub(crate) const SQL_DELETE_MIGRATION: &str =
    "DELETE FROM tracked_migrations WHERE migration = ?";

/// The capability set shared by all backends.
///
/// The ledger methods have default bodies using `?` placeholders; backends
/// with a different placeholder style override them.
pub trait SqlEngine {
    /// Create the configured database. Does not require [`open`](Self::open)
    /// first; server backends use a transient administrative connection.
    fn create_db(&mut self) -> Result<(), Error>;

    /// Drop the configured database. Does not require `open` first.
    fn drop_db(&mut self) -> Result<(), Error>;

    /// Open the connection to the configured database.
    fn open(&mut self) -> Result<(), Error>;

    /// Close the connection. A no-op when nothing is open.
    fn close(&mut self) -> Result<(), Error>;

    /// Idempotently create the migration ledger table.
    fn create_migrations_table(&mut self) -> Result<(), Error> {
        self.exec(SQL_CREATE_LEDGER, &[]).map(|_| ())
    }

    /// Record an applied migration identifier in the ledger.
    fn add_migration(&mut self, identifier: &str) -> Result<(), Error> {
        self.exec(SQL_ADD_MIGRATION, &[identifier]).map(|_| ())
    }

    /// Remove a migration identifier from the ledger.
    fn delete_migration(&mut self, identifier: &str) -> Result<(), Error> {
        self.exec(SQL_DELETE_MIGRATION, &[identifier]).map(|_| ())
    }

    /// Execute a statement, returning the affected row count where the
    /// backend reports one.
    fn exec(&mut self, stmt: &str, params: &[&str]) -> Result<u64, Error>;

    /// Run a query, returning every row with its columns rendered as text.
    fn query(&mut self, stmt: &str, params: &[&str]) -> Result<Vec<Vec<String>>, Error>;
}

/// Construct the engine for the configured backend kind. `root` anchors
/// relative SQLite3 database paths.
///
/// Fails before any I/O when the database name is empty or the kind is not
/// one of `mysql`, `postgres`, `sqlite3`.
#[cfg_attr(not(feature = "sqlite"), allow(unused_variables))]
pub fn new_engine(conf: &DbConfig, root: &Path) -> Result<Box<dyn SqlEngine>, Error> {
    if conf.name.is_empty() {
        return Err(Error::MissingName);
    }
    match conf.kind.as_str() {
        #[cfg(feature = "mysql")]
        "mysql" => Ok(Box::new(MysqlEngine::new(conf.clone()))),
        #[cfg(feature = "postgres")]
        "postgres" => Ok(Box::new(PostgresEngine::new(conf.clone()))),
        #[cfg(feature = "sqlite")]
        "sqlite3" => Ok(Box::new(Sqlite3Engine::new(conf, root))),
        other => Err(Error::UnknownKind(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_requires_a_database_name() {
        let conf = DbConfig {
            kind: "sqlite3".into(),
            ..Default::default()
        };
        assert!(matches!(
            new_engine(&conf, Path::new(".")),
            Err(Error::MissingName)
        ));
    }

    #[test]
    fn construction_rejects_unknown_kinds() {
        let conf = DbConfig {
            name: "app".into(),
            kind: "oracle".into(),
            ..Default::default()
        };
        match new_engine(&conf, Path::new(".")) {
            Err(Error::UnknownKind(kind)) => assert_eq!(kind, "oracle"),
            other => panic!("expected UnknownKind, got {:?}", other.map(|_| ())),
        }
    }

    #[cfg(all(feature = "sqlite", feature = "mysql", feature = "postgres"))]
    #[test]
    fn construction_accepts_each_known_kind() {
        for kind in ["mysql", "postgres", "sqlite3"] {
            let conf = DbConfig {
                name: "app".into(),
                kind: kind.into(),
                ..Default::default()
            };
            assert!(new_engine(&conf, Path::new(".")).is_ok(), "kind {kind}");
        }
    }
}
