// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Post-receive hook generation.
//!
//! The post-receive hook is where deployment actually happens. Git runs it
//! inside the bare repository after accepting a push. The hook pushdock
//! writes is a small two-state machine:
//!
//! 1. Working tree absent: clone the bare repository into the working tree.
//! 2. Working tree present: force checkout the deploy branch into the working
//!    tree, throwing away whatever local modifications it had.
//!
//! # Deferred Expansion
//!
//! Paths are baked into the hook as single-quoted shell variable assignments,
//! and referenced as `"$WORK_TREE"` everywhere else. The shell running the
//! hook at push time performs the expansion, never the installer. Single
//! quoting also means that paths with spaces, dollar signs, or quotes are
//! reproduced byte for byte.
//!
//! # Forced Checkout and Deleted Files
//!
//! A forced checkout through `--git-dir`/`--work-tree` only removes files
//! that the bare repository's index knows about. Bare repositories start
//! without an index, so right after the first clone the hook primes it with
//! `git read-tree`. From then on, a push that deletes a file also deletes it
//! from the working tree.

use crate::path::ProjectLayout;

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

/// Permission bits of installed hook.
pub const HOOK_MODE: u32 = 0o755;

/// Post-receive hook script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostReceiveHook {
    repo_dir: PathBuf,
    work_tree: PathBuf,
    branch: String,
}

impl PostReceiveHook {
    /// Construct new post-receive hook from project layout.
    pub fn new(layout: &ProjectLayout) -> Self {
        Self {
            repo_dir: layout.bare_repo().to_path_buf(),
            work_tree: layout.work_tree().to_path_buf(),
            branch: layout.branch().to_string(),
        }
    }

    /// Write hook into hooks directory, and mark it executable.
    ///
    /// Overwrites any existing post-receive hook. Creates hooks directory if
    /// it does not exist yet.
    ///
    /// # Errors
    ///
    /// - Return [`HookError::CreateDir`] if hooks directory cannot be created.
    /// - Return [`HookError::Write`] if hook cannot be written.
    /// - Return [`HookError::Permissions`] if hook cannot be made executable.
    #[instrument(skip(self, hooks_dir), level = "debug")]
    pub fn install(&self, hooks_dir: impl AsRef<Path>) -> Result<PathBuf> {
        let hooks_dir = hooks_dir.as_ref();
        fs::create_dir_all(hooks_dir).map_err(|source| HookError::CreateDir {
            source,
            path: hooks_dir.to_path_buf(),
        })?;

        let hook_path = hooks_dir.join("post-receive");
        info!("install post-receive hook {:?}", hook_path.display());
        fs::write(&hook_path, self.to_string()).map_err(|source| HookError::Write {
            source,
            path: hook_path.clone(),
        })?;
        make_executable(&hook_path)?;

        Ok(hook_path)
    }
}

impl Display for PostReceiveHook {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        writeln!(fmt, "#!/bin/sh")?;
        writeln!(fmt, "# post-receive hook generated by pushdock, do not edit.")?;
        writeln!(fmt, "set -e")?;
        writeln!(fmt)?;
        writeln!(fmt, "REPO_DIR={}", shell_quote(self.repo_dir.to_string_lossy()))?;
        writeln!(fmt, "WORK_TREE={}", shell_quote(self.work_tree.to_string_lossy()))?;
        writeln!(fmt, "BRANCH={}", shell_quote(&self.branch))?;
        fmt.write_str(HOOK_BODY)
    }
}

const HOOK_BODY: &str = r#"
# Git exports GIT_DIR for hooks. Address repositories explicitly instead.
unset GIT_DIR

deploy=no
while read -r oldrev newrev refname; do
    if [ "$refname" = "refs/heads/$BRANCH" ]; then
        deploy=yes
    fi
done

if [ "$deploy" != yes ]; then
    echo "pushdock: no update to $BRANCH, nothing to deploy"
    exit 0
fi

if [ -d "$WORK_TREE" ]; then
    echo "pushdock: checkout $BRANCH into $WORK_TREE"
    git --git-dir="$REPO_DIR" --work-tree="$WORK_TREE" checkout -f "$BRANCH"
else
    echo "pushdock: clone $REPO_DIR into $WORK_TREE"
    git clone --branch "$BRANCH" "$REPO_DIR" "$WORK_TREE"
    git --git-dir="$REPO_DIR" --work-tree="$WORK_TREE" read-tree "$BRANCH"
fi
"#;

/// Quote string as a single POSIX shell word.
///
/// Wraps the string in single quotes, turning every embedded single quote
/// into `'\''`. No character is special inside single quotes, so the shell
/// reproduces the string exactly.
pub fn shell_quote(value: impl AsRef<str>) -> String {
    format!("'{}'", value.as_ref().replace('\'', r"'\''"))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(HOOK_MODE)).map_err(|source| {
        HookError::Permissions {
            source,
            path: path.to_path_buf(),
        }
    })
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Hook installation error types.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// Hooks directory cannot be created.
    #[error("failed to create hooks directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Hook script cannot be written.
    #[error("failed to write hook {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Hook script cannot be marked executable.
    #[error("failed to mark hook {:?} executable", path.display())]
    Permissions {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
type Result<T, E = HookError> = std::result::Result<T, E>;
