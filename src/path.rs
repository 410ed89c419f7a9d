// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for the deployment target. Every path
//! pushdock touches for a project is derived from the project's name and the
//! layout settings, so two runs for the same project always agree on where the
//! bare repository, working tree, and post-receive hook live.

use crate::config::LayoutSettings;

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf, NoWayHome> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to pushdock's configuration file.
///
/// Uses `$XDG_CONFIG_HOME/pushdock/config.toml`. Does not check if the path
/// returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_config_path() -> Result<PathBuf, NoWayHome> {
    dirs::config_dir()
        .map(|path| path.join("pushdock").join("config.toml"))
        .ok_or(NoWayHome)
}

/// Name of project to provision.
///
/// A project name becomes a single path component twice over: once for the
/// bare repository (`<name>.git`), and once for the working tree. Thus, it
/// must be a plain, non-empty file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectName(String);

impl ProjectName {
    /// Construct new project name.
    ///
    /// # Errors
    ///
    /// - Return [`ProjectNameError`] if name cannot be used as a single path
    ///   component.
    pub fn new(name: impl Into<String>) -> Result<Self, ProjectNameError> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("name is empty")
        } else if name == "." || name == ".." {
            Some("name refers to a relative directory")
        } else if name.contains(['/', '\\']) {
            Some("name contains a path separator")
        } else if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            Some("name contains whitespace or control characters")
        } else if name.starts_with('-') {
            Some("name starts with '-'")
        } else if name.ends_with(".git") {
            Some("name already ends with '.git'")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ProjectNameError { name, reason }),
            None => Ok(Self(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for ProjectName {
    type Err = ProjectNameError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        Self::new(data)
    }
}

impl Display for ProjectName {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

/// Filesystem layout of a provisioned project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    name: ProjectName,
    bare_repo: PathBuf,
    work_tree: PathBuf,
    branch: String,
}

impl ProjectLayout {
    /// Derive project layout from layout settings.
    ///
    /// Relative roots are made absolute against the current directory. Git
    /// runs hooks from inside the bare repository, so a relative path baked
    /// into the hook would resolve somewhere else at push time.
    pub fn new(name: ProjectName, settings: &LayoutSettings) -> Self {
        let bare_repo = make_absolute(&settings.repo_root).join(format!("{name}.git"));
        let work_tree = make_absolute(&settings.work_root).join(name.as_str());

        Self {
            name,
            bare_repo,
            work_tree,
            branch: settings.branch.clone(),
        }
    }

    pub fn name(&self) -> &ProjectName {
        &self.name
    }

    /// Path to bare repository acting as push target.
    pub fn bare_repo(&self) -> &Path {
        self.bare_repo.as_path()
    }

    /// Path to working tree that pushed commits get checked out into.
    pub fn work_tree(&self) -> &Path {
        self.work_tree.as_path()
    }

    /// Branch whose pushes get deployed.
    pub fn branch(&self) -> &str {
        self.branch.as_str()
    }

    pub fn hooks_dir(&self) -> PathBuf {
        self.bare_repo.join("hooks")
    }

    pub fn hook_path(&self) -> PathBuf {
        self.hooks_dir().join("post-receive")
    }
}

impl Display for ProjectLayout {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        writeln!(fmt, "project:     {}", self.name)?;
        writeln!(fmt, "bare repo:   {}", self.bare_repo.display())?;
        writeln!(fmt, "work tree:   {}", self.work_tree.display())?;
        writeln!(fmt, "hook:        {}", self.hook_path().display())?;
        write!(fmt, "branch:      {}", self.branch)
    }
}

fn make_absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Project name cannot be used as a path component.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid project name {name:?}: {reason}")]
pub struct ProjectNameError {
    name: String,
    reason: &'static str,
}
