//! Migration scripts on disk: naming convention and up/down sections.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// The exact line dividing a script's up half from its down half.
pub const SECTION_SEPARATOR: &str = "!========================!";

/// One migration script discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    identifier: String,
    path: PathBuf,
}

impl MigrationFile {
    /// Wrap a script path, deriving the identifier from the filename prefix
    /// up to the first underscore (the 14-digit timestamp by convention).
    pub fn new(path: PathBuf) -> Self {
        let identifier = identifier_of(&path);
        Self { identifier, path }
    }

    /// The sortable timestamp prefix recorded in the ledger.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The filename, for diagnostics.
    pub fn short_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the script and split it into its up and down halves.
    pub fn sections(&self) -> Result<(String, String), Error> {
        let text = fs::read_to_string(&self.path)?;
        Ok(split_sections(&text))
    }
}

fn identifier_of(path: &Path) -> String {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    name.split('_').next().unwrap_or_default().to_string()
}

/// Split a script's text into up and down halves on [`SECTION_SEPARATOR`].
///
/// Lines before the first separator are up, lines after are down; separator
/// lines themselves are swallowed. Every retained line is re-joined with a
/// trailing newline so that line comments stay well-formed for the statement
/// splitter. Without a separator the whole script is the up half and the down
/// half is empty.
pub fn split_sections(text: &str) -> (String, String) {
    let mut up = String::new();
    let mut down = String::new();
    let mut in_down = false;
    for line in text.lines() {
        if line == SECTION_SEPARATOR {
            in_down = true;
            continue;
        }
        let section = if in_down { &mut down } else { &mut up };
        section.push_str(line);
        section.push('\n');
    }
    (up, down)
}
