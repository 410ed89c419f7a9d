// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Shell profile manipulation.
//!
//! The shell profile is the only piece of global mutable state pushdock
//! touches. It is treated as an append-only log: a line is appended if and
//! only if no existing line already matches it. Rerunning provisioning thus
//! never piles up duplicate PATH exports.

use crate::path::home_dir;

use std::{
    fs::{read_to_string, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Shell profile of the user running pushdock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellProfile {
    path: PathBuf,
}

impl ShellProfile {
    /// Construct new shell profile handle.
    ///
    /// The profile file itself need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Check if profile contains target line.
    ///
    /// Lines are compared with surrounding whitespace trimmed. A missing
    /// profile contains nothing.
    ///
    /// # Errors
    ///
    /// - Return [`ProfileError::Read`] if profile exists, but cannot be read.
    pub fn contains_line(&self, line: impl AsRef<str>) -> Result<bool> {
        let line = line.as_ref().trim();
        Ok(self
            .read()?
            .lines()
            .any(|existing| existing.trim() == line))
    }

    /// Append line to profile unless it is already present.
    ///
    /// Creates the profile if it does not exist. Returns true if the line was
    /// appended.
    ///
    /// # Errors
    ///
    /// - Return [`ProfileError::Read`] if profile cannot be read.
    /// - Return [`ProfileError::Write`] if profile cannot be appended to.
    #[instrument(skip(self, line), level = "debug")]
    pub fn ensure_line(&self, line: impl AsRef<str>) -> Result<bool> {
        let line = line.as_ref().trim();
        let content = self.read()?;
        if content.lines().any(|existing| existing.trim() == line) {
            debug!("{:?} already in {:?}", line, self.path.display());
            return Ok(false);
        }

        // INVARIANT: Never glue new line onto an unterminated last line.
        let mut entry = String::new();
        if !content.is_empty() && !content.ends_with('\n') {
            entry.push('\n');
        }
        entry.push_str(line);
        entry.push('\n');

        info!("append {:?} to {:?}", line, self.path.display());
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(entry.as_bytes()))
            .map_err(|source| ProfileError::Write {
                source,
                path: self.path.clone(),
            })?;

        Ok(true)
    }

    fn read(&self) -> Result<String> {
        match read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(ProfileError::Read {
                source,
                path: self.path.clone(),
            }),
        }
    }
}

/// Render PATH export line for target directory.
///
/// A directory under the user's home directory is written relative to
/// `$HOME`, so the profile line keeps working if the home directory moves.
/// Every other part of the path is escaped for a double-quoted shell string,
/// so the shell reads it back literally.
pub fn path_export_line(dir: impl AsRef<Path>) -> String {
    let dir = dir.as_ref();
    let rendered = match home_dir()
        .ok()
        .and_then(|home| dir.strip_prefix(home).ok().map(Path::to_path_buf))
    {
        Some(rest) if rest.as_os_str().is_empty() => "$HOME".to_string(),
        Some(rest) => format!("$HOME/{}", escape_double_quoted(&rest.to_string_lossy())),
        None => escape_double_quoted(&dir.to_string_lossy()),
    };

    format!("export PATH=\"{rendered}:$PATH\"")
}

fn escape_double_quoted(data: &str) -> String {
    let mut escaped = String::with_capacity(data.len());
    for c in data.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

/// Shell profile error types.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// Profile cannot be read.
    #[error("failed to read shell profile {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Profile cannot be appended to.
    #[error("failed to write shell profile {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
type Result<T, E = ProfileError> = std::result::Result<T, E>;
