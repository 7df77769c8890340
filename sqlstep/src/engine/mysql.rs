//! MySQL engine over the `mysql` crate.
//!
//! DDL statements cause an implicit commit in MySQL, so nothing here attempts
//! to wrap migration statements in a transaction; every statement commits as
//! it executes.

use mysql::prelude::Queryable;
use mysql::{Conn, Opts, Value};

use crate::config::DbConfig;
use crate::dsn::mysql_dsn;
use crate::error::Error;

use super::SqlEngine;

pub struct MysqlEngine {
    conf: DbConfig,
    conn: Option<Conn>,
}

impl MysqlEngine {
    pub fn new(conf: DbConfig) -> Self {
        Self { conf, conn: None }
    }

    fn connect(&self, with_db: bool) -> Result<Conn, Error> {
        let url = mysql_dsn(&self.conf, with_db);
        let opts = Opts::from_url(&url).map_err(mysql::Error::from)?;
        Ok(Conn::new(opts)?)
    }

    fn conn(&mut self) -> Result<&mut Conn, Error> {
        self.conn.as_mut().ok_or(Error::NotOpen)
    }
}

impl SqlEngine for MysqlEngine {
    fn create_db(&mut self) -> Result<(), Error> {
        // the target database may not exist yet, so connect at server level
        let mut conn = self.connect(false)?;
        conn.query_drop(format!("CREATE DATABASE IF NOT EXISTS {}", self.conf.name))?;
        Ok(())
    }

    fn drop_db(&mut self) -> Result<(), Error> {
        let mut conn = self.connect(false)?;
        conn.query_drop(format!("DROP DATABASE IF EXISTS {}", self.conf.name))?;
        Ok(())
    }

    fn open(&mut self) -> Result<(), Error> {
        self.conn = Some(self.connect(true)?);
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        self.conn.take();
        Ok(())
    }

    fn exec(&mut self, stmt: &str, params: &[&str]) -> Result<u64, Error> {
        let conn = self.conn()?;
        if params.is_empty() {
            // text protocol; migration statements carry no parameters
            conn.query_drop(stmt)?;
        } else {
            let values: Vec<Value> = params.iter().map(|p| Value::from(*p)).collect();
            conn.exec_drop(stmt, values)?;
        }
        Ok(conn.affected_rows())
    }

    fn query(&mut self, stmt: &str, params: &[&str]) -> Result<Vec<Vec<String>>, Error> {
        let conn = self.conn()?;
        let rows: Vec<mysql::Row> = if params.is_empty() {
            conn.query(stmt)?
        } else {
            let values: Vec<Value> = params.iter().map(|p| Value::from(*p)).collect();
            conn.exec(stmt, values)?
        };
        let mut out = Vec::with_capacity(rows.len());
        for mut row in rows {
            let mut columns = Vec::with_capacity(row.len());
            for i in 0..row.len() {
                let value: String = row
                    .take(i)
                    .ok_or_else(|| Error::Mysql(format!("missing column {} in result row", i)))?;
                columns.push(value);
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
            kind: "mysql".into(),
            ..Default::default()
        };
        let mut eng = MysqlEngine::new(conf);
        assert!(matches!(eng.exec("SELECT 1", &[]), Err(Error::NotOpen)));
    }
}
