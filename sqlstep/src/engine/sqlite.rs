//! SQLite3 engine: the database is a file under the project's data directory.
//!
//! There is no server level, so creating the database means ensuring its
//! containing directory exists (the file itself appears on first open) and
//! dropping it means deleting the file.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::config::DbConfig;
use crate::dsn::sqlite3_path;
use crate::error::Error;

use super::SqlEngine;

pub struct Sqlite3Engine {
    path: PathBuf,
    conn: Option<Connection>,
}

impl Sqlite3Engine {
    /// Resolve the database file path relative to `root`; see
    /// [`sqlite3_path`] for the resolution rules.
    pub fn new(conf: &DbConfig, root: &Path) -> Self {
        Self {
            path: sqlite3_path(conf, root),
            conn: None,
        }
    }

    /// The resolved database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&mut self) -> Result<&mut Connection, Error> {
        self.conn.as_mut().ok_or(Error::NotOpen)
    }
}

impl SqlEngine for Sqlite3Engine {
    fn create_db(&mut self) -> Result<(), Error> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    fn drop_db(&mut self) -> Result<(), Error> {
        fs::remove_file(&self.path)?;
        Ok(())
    }

    fn open(&mut self) -> Result<(), Error> {
        self.conn = Some(Connection::open(&self.path)?);
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| Error::Sqlite(e))?;
        }
        Ok(())
    }

    fn exec(&mut self, stmt: &str, params: &[&str]) -> Result<u64, Error> {
        let conn = self.conn()?;
        let changed = conn.execute(stmt, rusqlite::params_from_iter(params.iter().copied()))?;
        Ok(changed as u64)
    }

    fn query(&mut self, stmt: &str, params: &[&str]) -> Result<Vec<Vec<String>>, Error> {
        let conn = self.conn()?;
        let mut prepared = conn.prepare(stmt)?;
        let columns = prepared.column_count();
        let rows = prepared.query_map(rusqlite::params_from_iter(params.iter().copied()), |row| {
            let mut out = Vec::with_capacity(columns);
            for i in 0..columns {
                out.push(row.get::<_, String>(i)?);
            }
            Ok(out)
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(dir: &Path) -> Sqlite3Engine {
        let conf = DbConfig {
            name: "app".into(),
            kind: "sqlite3".into(),
            ..Default::default()
        };
        Sqlite3Engine::new(&conf, dir)
    }

    #[test]
    fn create_db_makes_the_data_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut eng = engine(dir.path());
        eng.create_db().unwrap();
        assert!(dir.path().join("db").is_dir());
        // the database file appears lazily on first open
        assert!(!eng.path().exists());
        eng.open().unwrap();
        eng.close().unwrap();
        assert!(eng.path().exists());
    }

    #[test]
    fn drop_db_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut eng = engine(dir.path());
        eng.create_db().unwrap();
        eng.open().unwrap();
        eng.close().unwrap();
        eng.drop_db().unwrap();
        assert!(!eng.path().exists());
    }

    #[test]
    fn exec_before_open_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut eng = engine(dir.path());
        assert!(matches!(eng.exec("SELECT 1", &[]), Err(Error::NotOpen)));
    }

    #[test]
    fn ledger_round_trip_preserves_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut eng = engine(dir.path());
        eng.create_db().unwrap();
        eng.open().unwrap();
        eng.create_migrations_table().unwrap();
        // idempotent
        eng.create_migrations_table().unwrap();

        eng.add_migration("20140101000000").unwrap();
        eng.add_migration("20140102000000").unwrap();
        let rows = eng
            .query("SELECT migration FROM tracked_migrations", &[])
            .unwrap();
        assert_eq!(
            rows,
            vec![vec!["20140101000000".to_string()], vec!["20140102000000".to_string()]]
        );

        eng.delete_migration("20140102000000").unwrap();
        let rows = eng
            .query("SELECT migration FROM tracked_migrations", &[])
            .unwrap();
        assert_eq!(rows, vec![vec!["20140101000000".to_string()]]);
    }

    #[test]
    fn create_migrations_table_keeps_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut eng = engine(dir.path());
        eng.create_db().unwrap();
        eng.open().unwrap();
        eng.create_migrations_table().unwrap();
        eng.add_migration("20140101000000").unwrap();
        eng.create_migrations_table().unwrap();
        let rows = eng
            .query("SELECT migration FROM tracked_migrations", &[])
            .unwrap();
        assert_eq!(rows.len(), 1);
    }
}
