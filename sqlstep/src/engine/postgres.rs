//! PostgreSQL engine over the `postgres` crate.
//!
//! `CREATE DATABASE` cannot run against the database it creates, so the
//! administrative operations connect to the maintenance database `postgres`
//! (see [`postgres_dsn`]).

use postgres::types::ToSql;
use postgres::{Client, NoTls};

use crate::config::DbConfig;
use crate::dsn::postgres_dsn;
use crate::error::Error;

use super::{SqlEngine, MIGRATION_TABLE};

pub struct PostgresEngine {
    conf: DbConfig,
    client: Option<Client>,
}

impl PostgresEngine {
    pub fn new(conf: DbConfig) -> Self {
        Self { conf, client: None }
    }

    fn connect(&self, with_db: bool) -> Result<Client, Error> {
        let dsn = postgres_dsn(&self.conf, with_db);
        Ok(Client::connect(&dsn, NoTls)?)
    }

    fn client(&mut self) -> Result<&mut Client, Error> {
        self.client.as_mut().ok_or(Error::NotOpen)
    }
}

fn sql_params<'a>(params: &'a [&'a str]) -> Vec<&'a (dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

impl SqlEngine for PostgresEngine {
    fn create_db(&mut self) -> Result<(), Error> {
        let mut client = self.connect(false)?;
        client.batch_execute(&format!("CREATE DATABASE {}", self.conf.name))?;
        client.close()?;
        Ok(())
    }

    fn drop_db(&mut self) -> Result<(), Error> {
        let mut client = self.connect(false)?;
        client.batch_execute(&format!("DROP DATABASE IF EXISTS {}", self.conf.name))?;
        client.close()?;
        Ok(())
    }

    fn open(&mut self) -> Result<(), Error> {
        self.client = Some(self.connect(true)?);
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        if let Some(client) = self.client.take() {
            client.close()?;
        }
        Ok(())
    }

    fn add_migration(&mut self, identifier: &str) -> Result<(), Error> {
        self.exec(
            &format!("INSERT INTO {} (migration) VALUES ($1)", MIGRATION_TABLE),
            &[identifier],
        )
        .map(|_| ())
    }

    fn delete_migration(&mut self, identifier: &str) -> Result<(), Error> {
        self.exec(
            &format!("DELETE FROM {} WHERE migration = $1", MIGRATION_TABLE),
            &[identifier],
        )
        .map(|_| ())
    }

    fn exec(&mut self, stmt: &str, params: &[&str]) -> Result<u64, Error> {
        let client = self.client()?;
        if params.is_empty() {
            // simple protocol; tolerates anything a migration script contains
            client.batch_execute(stmt)?;
            Ok(0)
        } else {
            Ok(client.execute(stmt, &sql_params(params))?)
        }
    }

    fn query(&mut self, stmt: &str, params: &[&str]) -> Result<Vec<Vec<String>>, Error> {
        let client = self.client()?;
        let rows = client.query(stmt, &sql_params(params))?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut columns = Vec::with_capacity(row.len());
            for i in 0..row.len() {
                columns.push(row.try_get::<_, String>(i)?);
            }
            out.push(columns);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_before_open_is_an_error() {
        let conf = DbConfig {
            name: "app".into(),
            kind: "postgres".into(),
            ..Default::default()
        };
        let mut eng = PostgresEngine::new(conf);
        assert!(matches!(eng.exec("SELECT 1", &[]), Err(Error::NotOpen)));
    }
}
