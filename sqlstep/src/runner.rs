//! The sync/diff algorithm and migration execution.
//!
//! A run loads the on-disk migration set and the database's applied-migration
//! ledger, validates that the ledger is a positional prefix of the file list,
//! computes what must run, and executes it one script at a time through an
//! open [`SqlEngine`].
//!
//! Statements execute in autocommit mode: no transaction spans a migration,
//! so a failing migration leaves its earlier statements applied and its
//! ledger entry unwritten. See the crate docs for the implications.

use std::fs;
use std::path::PathBuf;

use crate::engine::{SqlEngine, MIGRATION_TABLE};
use crate::error::Error;
use crate::script::MigrationFile;
use crate::splitter::StatementSplitter;

type Hook = Box<dyn Fn(&str)>;

/// Drives forward and backward migration runs against an open engine.
pub struct Runner {
    migrate_dir: PathBuf,
    on_migration_start: Option<Hook>,
    on_statement: Option<Hook>,
}

/// What a run did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Identifiers applied (migrate) or reverted (rollback), in execution
    /// order. Empty means the database was already up to date / had nothing
    /// to roll back.
    pub migrations_run: Vec<String>,
    /// Ledger identifiers with no corresponding migration file on disk,
    /// reported for operator attention; they never abort a run by themselves.
    pub missing_sources: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Up,
    Down,
}

impl Runner {
    pub fn new(migrate_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrate_dir: migrate_dir.into(),
            on_migration_start: None,
            on_statement: None,
        }
    }

    /// Set a callback invoked with each migration's filename as it starts.
    pub fn on_migration_start(mut self, callback: impl Fn(&str) + 'static) -> Self {
        self.on_migration_start = Some(Box::new(callback));
        self
    }

    /// Set a callback invoked with each executed statement, trimmed.
    pub fn on_statement(mut self, callback: impl Fn(&str) + 'static) -> Self {
        self.on_statement = Some(Box::new(callback));
        self
    }

    /// List the `.sql` migration scripts, sorted ascending by filename.
    /// Other files and directories under the migrate directory are ignored.
    pub fn list_migrations(&self) -> Result<Vec<MigrationFile>, Error> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.migrate_dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|e| e == "sql") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths.into_iter().map(MigrationFile::new).collect())
    }

    /// Apply up to `step` pending migrations in ascending identifier order.
    /// `step == 0` (or any value beyond the pending count) applies them all.
    pub fn migrate(
        &self,
        engine: &mut dyn SqlEngine,
        step: usize,
    ) -> Result<MigrationReport, Error> {
        let (files, ledger, missing_sources) = self.load(engine)?;
        let mut report = MigrationReport {
            missing_sources,
            ..Default::default()
        };

        let pending = files.len().saturating_sub(ledger.len());
        if pending == 0 {
            return Ok(report);
        }
        let step = if step == 0 || step > pending { pending } else { step };

        #[cfg(feature = "tracing")]
        tracing::info!(pending, step, "running migrations");

        for file in &files[ledger.len()..ledger.len() + step] {
            self.run_one(engine, file, Direction::Up)?;
            report.migrations_run.push(file.identifier().to_string());
        }
        Ok(report)
    }

    /// Revert the most recently applied `step` migrations in descending
    /// identifier order. `step == 0` reverts one; any value beyond the
    /// applied count reverts them all.
    pub fn rollback(
        &self,
        engine: &mut dyn SqlEngine,
        step: usize,
    ) -> Result<MigrationReport, Error> {
        let (files, ledger, missing_sources) = self.load(engine)?;
        let mut report = MigrationReport {
            missing_sources,
            ..Default::default()
        };

        // only the ledger prefix matched by on-disk files can be reverted
        let matched = ledger.len().min(files.len());
        if matched == 0 {
            return Ok(report);
        }
        let step = match step {
            0 => 1,
            n => n.min(matched),
        };

        #[cfg(feature = "tracing")]
        tracing::info!(applied = matched, step, "rolling back migrations");

        for file in files[matched - step..matched].iter().rev() {
            self.run_one(engine, file, Direction::Down)?;
            report.migrations_run.push(file.identifier().to_string());
        }
        Ok(report)
    }

    /// Load and validate both sides of the diff: the sorted file list, the
    /// ledger in insertion order, and any ledger tail with no source file.
    fn load(
        &self,
        engine: &mut dyn SqlEngine,
    ) -> Result<(Vec<MigrationFile>, Vec<String>, Vec<String>), Error> {
        let files = self.list_migrations()?;
        engine.create_migrations_table()?;
        let ledger = read_ledger(engine)?;
        let missing = check_consistency(&files, &ledger)?;
        Ok((files, ledger, missing))
    }

    fn run_one(
        &self,
        engine: &mut dyn SqlEngine,
        file: &MigrationFile,
        direction: Direction,
    ) -> Result<(), Error> {
        if let Some(hook) = &self.on_migration_start {
            hook(file.short_name());
        }
        #[cfg(feature = "tracing")]
        tracing::info!(migration = file.short_name(), ?direction, "running migration");

        let (up, down) = file.sections()?;
        match direction {
            Direction::Up => {
                self.run_part(engine, &up)?;
                engine.add_migration(file.identifier())
            }
            Direction::Down => {
                if down.is_empty() {
                    return Err(Error::MissingDown(file.short_name().to_string()));
                }
                self.run_part(engine, &down)?;
                engine.delete_migration(file.identifier())
            }
        }
    }

    /// Execute one script half, statement by statement, as the splitter
    /// produces them. The first failure aborts with the offending statement;
    /// statements already executed stay applied.
    fn run_part(&self, engine: &mut dyn SqlEngine, part: &str) -> Result<(), Error> {
        for stmt in StatementSplitter::new(part) {
            if let Err(source) = engine.exec(stmt, &[]) {
                return Err(Error::Statement {
                    stmt: stmt.to_string(),
                    source: Box::new(source),
                });
            }
            if let Some(hook) = &self.on_statement {
                hook(stmt.trim());
            }
        }
        Ok(())
    }
}

/// Read the applied-migration ledger in the table's natural insertion order.
fn read_ledger(engine: &mut dyn SqlEngine) -> Result<Vec<String>, Error> {
    let rows = engine.query(&format!("SELECT migration FROM {}", MIGRATION_TABLE), &[])?;
    Ok(rows
        .into_iter()
        .filter_map(|mut row| {
            if row.is_empty() {
                None
            } else {
                Some(row.remove(0))
            }
        })
        .collect())
}

/// Walk files and ledger in lockstep. The first positional mismatch is fatal;
/// ledger entries beyond the end of the file list are returned for reporting.
fn check_consistency(files: &[MigrationFile], ledger: &[String]) -> Result<Vec<String>, Error> {
    for (file, applied) in files.iter().zip(ledger.iter()) {
        if file.identifier() != applied {
            return Err(Error::OutOfSync {
                ledger: applied.clone(),
                file: file.short_name().to_string(),
            });
        }
    }
    let leftover: Vec<String> = ledger.get(files.len()..).unwrap_or_default().to_vec();
    #[cfg(feature = "tracing")]
    if !leftover.is_empty() {
        tracing::warn!(
            missing = ?leftover,
            "migrations recorded as applied but missing on disk"
        );
    }
    Ok(leftover)
}
