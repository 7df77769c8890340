//! `sqlstep` applies and reverts ordered, file-based SQL migration scripts
//! against a relational database, tracking which scripts have run so that
//! repeated invocations are idempotent and safe to resume.
//!
//! Core concepts:
//! - Migrations are plain `.sql` files named `<14-digit-timestamp>_<slug>.sql`
//!   under a project's `db/migrate` directory. Lexicographic filename order is
//!   chronological order, and the timestamp prefix is the migration's
//!   canonical identifier.
//! - A script holds an "up" half and an optional "down" half, divided by the
//!   sentinel line [`script::SECTION_SEPARATOR`].
//! - Applied identifiers are recorded in a ledger table
//!   ([`engine::MIGRATION_TABLE`]) inside the target database itself, in
//!   application order.
//! - The [`runner::Runner`] diffs the on-disk migration set against the
//!   ledger, validates that the ledger is a prefix of the file list, and
//!   executes whatever is pending through a backend [`engine::SqlEngine`].
//!
//! # Database support
//!
//! - SQLite3 - available with the `sqlite` feature flag.
//! - MySQL - available with the `mysql` feature flag.
//! - PostgreSQL - available with the `postgres` feature flag.
//!
//! All three are enabled by default; the configured backend kind is selected
//! at runtime by [`engine::new_engine`].
//!
//! # Transaction policy
//!
//! Every statement commits independently (autocommit); no transaction spans a
//! migration. A migration that fails partway leaves its earlier statements
//! applied and its ledger entry unwritten, so a fixed and re-run migration may
//! re-execute statements that already ran. Write idempotent DDL
//! (`IF NOT EXISTS` and friends) where your backend allows it.
//!
//! # Example
//!
//! ```no_run
//! use sqlstep::{config::DbConfig, engine::new_engine, runner::Runner};
//!
//! let conf = DbConfig {
//!     name: "development".into(),
//!     kind: "sqlite3".into(),
//!     ..Default::default()
//! };
//! let root = std::path::Path::new(".");
//!
//! let mut engine = new_engine(&conf, root)?;
//! engine.open()?;
//! let report = Runner::new(root.join("db/migrate")).migrate(&mut *engine, 0)?;
//! println!("applied {} migrations", report.migrations_run.len());
//! engine.close()?;
//! # Ok::<(), sqlstep::Error>(())
//! ```

pub mod config;
pub mod dsn;
pub mod engine;
mod error;
pub mod runner;
pub mod script;
pub mod splitter;

pub use config::DbConfig;
pub use engine::{new_engine, SqlEngine};
pub use error::Error;
pub use runner::{MigrationReport, Runner};
pub use script::MigrationFile;
pub use splitter::StatementSplitter;
