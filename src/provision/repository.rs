// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Bare repository bootstrapping.
//!
//! Every project gets exactly one bare repository to act as its push target.
//! Bootstrapping is idempotent: an existing repository is opened and left as
//! is, so rerunning provisioning never rewrites history, HEAD, or
//! configuration of a repository that already received pushes.

use crate::path::ProjectLayout;

use git2::{Repository, RepositoryInitOptions};
use mkdirp::mkdirp;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Outcome of bootstrapping a bare repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bootstrap {
    /// Repository was freshly initialized.
    Created,

    /// Repository already existed, and was left untouched.
    Existing,
}

/// Ensure bare repository of project exists.
///
/// Creates any missing parent directories. Freshly initialized repositories
/// point HEAD at the deploy branch, so the first push of that branch becomes
/// the repository's default branch.
///
/// # Errors
///
/// - Return [`RepositoryError::Occupied`] if path is taken by something that
///   is not a git repository.
/// - Return [`RepositoryError::CreateParent`] if parent directories cannot be
///   created.
/// - Return [`RepositoryError::Git2`] if libgit2 operations fail.
#[instrument(skip(layout), level = "debug")]
pub fn bootstrap(layout: &ProjectLayout) -> Result<Bootstrap> {
    let path = layout.bare_repo();

    if path.exists() {
        return match Repository::open_bare(path) {
            Ok(_) => {
                info!("bare repository {:?} already exists", path.display());
                Ok(Bootstrap::Existing)
            }
            Err(error) if is_empty_dir(path) => {
                debug!("empty directory at {:?}: {error}", path.display());
                init(path, layout.branch())?;
                Ok(Bootstrap::Created)
            }
            Err(_) => Err(RepositoryError::Occupied {
                path: path.to_path_buf(),
            }),
        };
    }

    if let Some(parent) = path.parent() {
        mkdirp(parent).map_err(|source| RepositoryError::CreateParent {
            source,
            path: parent.to_path_buf(),
        })?;
    }

    init(path, layout.branch())?;

    Ok(Bootstrap::Created)
}

fn init(path: &Path, branch: &str) -> Result<Repository> {
    info!("initialize bare repository {:?}", path.display());
    let mut opts = RepositoryInitOptions::new();
    opts.bare(true);
    opts.initial_head(branch);

    Ok(Repository::init_opts(path, &opts)?)
}

fn is_empty_dir(path: &Path) -> bool {
    path.read_dir()
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

/// Repository bootstrapping error types.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Target path exists, but is not a git repository.
    #[error("{:?} exists but is not a bare git repository", path.display())]
    Occupied { path: PathBuf },

    /// Parent directories of repository cannot be created.
    #[error("failed to create directory {:?}", path.display())]
    CreateParent {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),
}

/// Friendly result alias :3
type Result<T, E = RepositoryError> = std::result::Result<T, E>;
