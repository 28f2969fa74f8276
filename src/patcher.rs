//! Linker script patching with backup and restore.
//!
//! The linker script is the one shared mutable file in the pipeline. The
//! patcher captures its pristine text before the first substitution, keeps
//! an on-disk backup alongside it, and guarantees the script can be put
//! back byte-identical after the run.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PatchError;
use crate::models::LinkBase;

// Matches address literals as they appear in the script text.
static ADDRESS_LITERAL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"0x[0-9a-fA-F]{4,16}").expect("Invalid address literal regex"));

/// Result type for patching operations.
pub type PatchResult<T> = std::result::Result<T, PatchError>;

/// Patcher for the linker script's link-base address literal.
pub struct LinkerPatcher {
    script_path: PathBuf,
    backup_path: PathBuf,
    /// Pristine text captured by `begin()`; the restore source.
    original: Option<String>,
}

impl LinkerPatcher {
    /// Create a patcher for the given linker script. No file access happens
    /// until `begin()`.
    pub fn new(script_path: PathBuf) -> Self {
        let backup_path = backup_path_for(&script_path);
        LinkerPatcher {
            script_path,
            backup_path,
            original: None,
        }
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Capture the pristine script text and write the on-disk backup.
    ///
    /// Must be called once before any substitution.
    pub fn begin(&mut self) -> PatchResult<()> {
        if !self.script_path.exists() {
            return Err(PatchError::ScriptNotFound(self.script_path.clone()));
        }

        let content = self.read()?;
        fs::write(&self.backup_path, &content).map_err(|e| PatchError::Io {
            file: self.backup_path.clone(),
            source: e,
        })?;
        log::debug!(
            "Backed up {} to {}",
            self.script_path.display(),
            self.backup_path.display()
        );

        self.original = Some(content);
        Ok(())
    }

    /// Count occurrences of an address literal in the current script text.
    pub fn count_occurrences(&self, base: LinkBase) -> PatchResult<usize> {
        let content = self.read()?;
        Ok(content.matches(&base.literal()).count())
    }

    /// Replace every occurrence of `from` with `to` and write the script
    /// back. Returns the number of occurrences replaced.
    ///
    /// A missing `from` literal is an error, never a silent no-op: copying
    /// on after a patch that did nothing would build the wrong variant.
    pub fn set_link_base(&self, from: LinkBase, to: LinkBase) -> PatchResult<usize> {
        if self.original.is_none() {
            return Err(PatchError::NotStarted);
        }

        let from_literal = from.literal();
        let to_literal = to.literal();

        let content = self.read()?;
        let count = content.matches(&from_literal).count();
        if count == 0 {
            let present = address_literals(&content);
            log::error!(
                "{} does not contain {}; literals present: [{}]",
                self.script_path.display(),
                from_literal,
                present.join(", ")
            );
            return Err(PatchError::AddressNotFound {
                literal: from_literal,
                file: self.script_path.clone(),
            });
        }

        if from == to {
            log::debug!(
                "Link base already {} in {}, nothing to patch",
                to_literal,
                self.script_path.display()
            );
            return Ok(count);
        }

        let patched = content.replace(&from_literal, &to_literal);
        self.write(&patched)?;
        log::info!(
            "Patched {} occurrence(s) of {} -> {} in {}",
            count,
            from_literal,
            to_literal,
            self.script_path.display()
        );

        Ok(count)
    }

    /// Write the pristine text back and remove the backup file.
    pub fn restore(&self) -> PatchResult<()> {
        let original = self.original.as_ref().ok_or(PatchError::NotStarted)?;
        self.write(original)?;

        if self.backup_path.exists() {
            if let Err(e) = fs::remove_file(&self.backup_path) {
                log::warn!(
                    "Failed to remove backup {}: {}",
                    self.backup_path.display(),
                    e
                );
            }
        }

        log::info!("Restored {}", self.script_path.display());
        Ok(())
    }

    fn read(&self) -> PatchResult<String> {
        fs::read_to_string(&self.script_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PatchError::ScriptNotFound(self.script_path.clone())
            } else {
                PatchError::Io {
                    file: self.script_path.clone(),
                    source: e,
                }
            }
        })
    }

    fn write(&self, content: &str) -> PatchResult<()> {
        fs::write(&self.script_path, content).map_err(|e| PatchError::Io {
            file: self.script_path.clone(),
            source: e,
        })
    }
}

/// Distinct address literals appearing in the script, in first-seen order.
fn address_literals(content: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for m in ADDRESS_LITERAL_REGEX.find_iter(content) {
        let literal = m.as_str().to_string();
        if !seen.contains(&literal) {
            seen.push(literal);
        }
    }
    seen
}

/// Backup filename: `link.lds` -> `link.lds.orig`, kept in the same
/// directory so the script and its backup travel together.
fn backup_path_for(script_path: &Path) -> PathBuf {
    let mut name = script_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".orig");
    script_path.with_file_name(name)
}
