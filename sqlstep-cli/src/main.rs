//! `sqlstep`: file-based SQL schema migrations.
//!
//! The binary discovers the project root, loads `<root>/db/config.toml`,
//! and drives the library's engine and runner for the selected environment.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sqlstep::config;
use sqlstep::script::SECTION_SEPARATOR;
use sqlstep::{new_engine, Runner, SqlEngine};

#[derive(Parser)]
#[command(name = "sqlstep", version, about = "File-based SQL schema migrations")]
struct Cli {
    /// Use the current directory as the project root instead of searching
    /// upward for a version-control root
    #[arg(long, global = true)]
    root: bool,

    /// Configuration environment to use
    #[arg(long, global = true, default_value = "development")]
    env: String,

    /// Print each migration and statement as it runs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the db directory, a starter config file and the migrate directory
    Init,
    /// Scaffold a new migration script named from the given words
    New {
        /// Words joined with `_` to form the migration name
        #[arg(required = true)]
        name: Vec<String>,
    },
    /// Apply pending migrations
    Migrate {
        /// Number of migrations to apply (0 = all pending)
        #[arg(long, default_value_t = 0)]
        step: usize,
    },
    /// Revert applied migrations, most recent first
    Rollback {
        /// Number of migrations to revert (0 = 1)
        #[arg(long, default_value_t = 0)]
        step: usize,
    },
    /// Create the configured database
    Create,
    /// Drop the configured database
    Drop,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(cli: Cli) -> Result<()> {
    validate_env(&cli.env)?;
    let root = find_root(cli.root)?;
    tracing::debug!(root = %root.display(), env = %cli.env, "resolved project root");

    match cli.command {
        Commands::Init => init(&root),
        Commands::New { name } => new_migration(&root, &name.join("_")),
        Commands::Migrate { step } => with_engine(&cli, &root, |engine, runner| {
            let report = runner.migrate(engine, step)?;
            warn_missing_sources(&report.missing_sources);
            if report.migrations_run.is_empty() {
                println!("Up to date.");
            } else {
                println!("Applied {} migration(s).", report.migrations_run.len());
            }
            Ok(())
        }),
        Commands::Rollback { step } => with_engine(&cli, &root, |engine, runner| {
            let report = runner.rollback(engine, step)?;
            warn_missing_sources(&report.missing_sources);
            if report.migrations_run.is_empty() {
                println!("Nothing to rollback.");
            } else {
                println!("Reverted {} migration(s).", report.migrations_run.len());
            }
            Ok(())
        }),
        Commands::Create => {
            let conf = load_config(&root, &cli.env)?;
            let mut engine = new_engine(&conf, &root)?;
            engine.create_db()?;
            println!("Created database {}.", conf.name);
            Ok(())
        }
        Commands::Drop => {
            let conf = load_config(&root, &cli.env)?;
            let mut engine = new_engine(&conf, &root)?;
            engine.drop_db()?;
            println!("Dropped database {}.", conf.name);
            Ok(())
        }
    }
}

/// Resolve the project root: the nearest version-control root above the
/// working directory, or the working directory itself with `--root`.
fn find_root(use_cwd: bool) -> Result<PathBuf> {
    let cwd = env::current_dir().context("could not determine working directory")?;
    if use_cwd {
        return Ok(cwd);
    }
    Ok(config::find_vcs_root(&cwd).unwrap_or(cwd))
}

fn load_config(root: &Path, env: &str) -> Result<config::DbConfig> {
    let path = config::config_path(root);
    config::load(&path, env).with_context(|| format!("environment {env:?}"))
}

/// Open the engine, run `f`, and close the connection on every exit path.
fn with_engine(
    cli: &Cli,
    root: &Path,
    f: impl FnOnce(&mut dyn SqlEngine, &Runner) -> Result<()>,
) -> Result<()> {
    let conf = load_config(root, &cli.env)?;
    let mut engine = new_engine(&conf, root)?;
    engine.open()?;

    let mut runner = Runner::new(config::migrate_dir(root));
    if cli.verbose {
        runner = runner
            .on_migration_start(|name| {
                println!("=====================================");
                println!("Migration: {name}");
            })
            .on_statement(|stmt| println!("{stmt}"));
    }

    let result = f(&mut *engine, &runner);
    let closed = engine.close();
    result?;
    closed?;
    Ok(())
}

fn warn_missing_sources(missing: &[String]) {
    for id in missing {
        eprintln!("Warning: migration {id} is recorded as applied but has no file on disk.");
    }
}

fn init(root: &Path) -> Result<()> {
    let file = config::touch(root)?;
    let dir = config::migrate_dir(root);
    fs::create_dir_all(&dir)?;
    println!("Initialized {} and {}.", file.display(), dir.display());
    Ok(())
}

fn new_migration(root: &Path, name: &str) -> Result<()> {
    validate_name(name)?;
    let dir = config::migrate_dir(root);
    fs::create_dir_all(&dir)?;
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    let path = dir.join(format!("{stamp}_{name}.sql"));
    fs::write(
        &path,
        format!("-- up migration\n{SECTION_SEPARATOR}\n-- down migration\n"),
    )?;
    println!("Created {}.", path.display());
    Ok(())
}

/// Migration names are lowercase words separated by single-or-more
/// underscores, with letters at both ends.
fn validate_name(name: &str) -> Result<()> {
    let bytes = name.as_bytes();
    let ok = !bytes.is_empty()
        && bytes[0].is_ascii_lowercase()
        && bytes[bytes.len() - 1].is_ascii_lowercase()
        && bytes.iter().all(|b| b.is_ascii_lowercase() || *b == b'_');
    if !ok {
        bail!("invalid migration name {name:?}: lowercase words separated by underscores");
    }
    Ok(())
}

fn validate_env(env: &str) -> Result<()> {
    if env.is_empty() || !env.bytes().all(|b| b.is_ascii_lowercase()) {
        bail!("invalid environment name {env:?}: lowercase letters only");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_names_must_be_lowercase_words() {
        assert!(validate_name("create_users").is_ok());
        assert!(validate_name("a").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("CreateUsers").is_err());
        assert!(validate_name("_leading").is_err());
        assert!(validate_name("trailing_").is_err());
        assert!(validate_name("has space").is_err());
        assert!(validate_name("v2_schema").is_err());
    }

    #[test]
    fn environment_names_are_lowercase_only() {
        assert!(validate_env("development").is_ok());
        assert!(validate_env("ci").is_ok());
        assert!(validate_env("").is_err());
        assert!(validate_env("Production").is_err());
        assert!(validate_env("dev-1").is_err());
    }

    #[test]
    fn init_creates_config_and_migrate_dir() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path()).unwrap();
        assert!(config::config_path(dir.path()).is_file());
        assert!(config::migrate_dir(dir.path()).is_dir());
    }

    #[test]
    fn new_migration_scaffolds_a_timestamped_script() {
        let dir = tempfile::tempdir().unwrap();
        new_migration(dir.path(), "create_users").unwrap();

        let entries: Vec<_> = fs::read_dir(config::migrate_dir(dir.path()))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries.len(), 1);
        let file_name = entries[0].file_name().unwrap().to_str().unwrap();
        assert!(file_name.ends_with("_create_users.sql"));
        // 14-digit timestamp prefix
        let prefix = file_name.split('_').next().unwrap();
        assert_eq!(prefix.len(), 14);
        assert!(prefix.bytes().all(|b| b.is_ascii_digit()));

        let content = fs::read_to_string(&entries[0]).unwrap();
        assert!(content.contains(SECTION_SEPARATOR));
        assert!(content.starts_with("-- up migration\n"));
    }
}
