//! Access to the project's database configuration file.
//!
//! A project keeps everything this tool touches under `<root>/db`: the
//! configuration file, the migration scripts, and (for SQLite3) the database
//! files themselves. The configuration file maps environment names to
//! [`DbConfig`] tables:
//!
//! ```toml
//! [development]
//! name = "development"
//! kind = "sqlite3"
//!
//! [production]
//! host = "myserver.com"
//! name = "production"
//! kind = "mysql"
//! user = "username"
//! pass = "password"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;

/// Name of the configuration file under the data directory.
pub const CONFIG_FILE: &str = "config.toml";
/// Directory under the project root where database files live.
pub const DATA_DIR: &str = "db";
/// Directory under the data directory holding migration scripts.
pub const MIGRATE_DIR: &str = "migrate";

/// A single environment's database configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Database name; for SQLite3, the database file name or path.
    pub name: String,
    /// Backend kind: `mysql`, `postgres` or `sqlite3`.
    pub kind: String,
    /// Server host, optionally `host:port`. Empty means the driver default.
    pub host: String,
    pub user: String,
    pub pass: String,
    /// Request a TLS connection (PostgreSQL only).
    pub ssl: bool,
    /// Skip certificate verification when `ssl` is set.
    pub ssl_skip_verify: bool,
}

/// All configured environments, keyed by environment name.
pub type Configuration = BTreeMap<String, DbConfig>;

/// Path of the configuration file for a project root.
pub fn config_path(root: &Path) -> PathBuf {
    root.join(DATA_DIR).join(CONFIG_FILE)
}

/// Path of the migration script directory for a project root.
pub fn migrate_dir(root: &Path) -> PathBuf {
    root.join(DATA_DIR).join(MIGRATE_DIR)
}

/// Load the configuration file at `path` and select the `env` environment.
pub fn load(path: &Path, env: &str) -> Result<DbConfig, Error> {
    let text = fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("could not read config file {}: {}", path.display(), e))
    })?;
    let configs: Configuration = toml::from_str(&text)
        .map_err(|e| Error::Config(format!("could not decode config file: {}", e)))?;
    configs
        .get(env)
        .cloned()
        .ok_or_else(|| Error::Config(format!("no such configured environment: {}", env)))
}

/// Write a starter configuration under `root`, creating the data directory.
/// An existing config file is left untouched. Returns the config file path.
pub fn touch(root: &Path) -> Result<PathBuf, Error> {
    let dir = root.join(DATA_DIR);
    fs::create_dir_all(&dir)?;
    let file = dir.join(CONFIG_FILE);
    if !file.exists() {
        fs::write(&file, STARTER_CONFIG)?;
    }
    Ok(file)
}

/// Ascend from `start` to the first directory containing a VCS marker.
pub fn find_vcs_root(start: &Path) -> Option<PathBuf> {
    const MARKERS: [&str; 3] = [".git", ".hg", ".svn"];
    let mut dir = Some(start);
    while let Some(d) = dir {
        if MARKERS.iter().any(|m| d.join(m).exists()) {
            return Some(d.to_path_buf());
        }
        dir = d.parent();
    }
    None
}

const STARTER_CONFIG: &str = r#"[development]
name = "development"
kind = "sqlite3"

[testing]
name = "testing"
kind = "sqlite3"

[production]
host = "myserver.com" # could also be "/var/run/mysqld/mysqld.sock"
name = "production"
kind = "mysql"
user = "username"
pass = "password"
"#;
