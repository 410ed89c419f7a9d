// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Toolchain bootstrapping.
//!
//! Install a package manager through its official installer script, unless
//! its executable already sits at its known path. Afterwards make sure the
//! directory holding the executable is exported through the user's shell
//! profile.
//!
//! Installer scripts are fetched over HTTPS, and piped into `sh`. A failed
//! download or a failed installer is fatal. There is no retry.

use crate::{
    config::ToolchainSettings,
    provision::profile::{path_export_line, ShellProfile},
    syscall::syscall_with_stdin,
};

use indicatif::{ProgressBar, ProgressStyle};
use std::{io::Read, path::PathBuf, time::Duration};
use tracing::{info, instrument};

/// Outcome of ensuring toolchain is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolchainStatus {
    /// Installer was run.
    pub installed: bool,

    /// PATH export was appended to shell profile.
    pub profile_updated: bool,
}

/// Fetch installer scripts.
pub trait InstallerFetch {
    /// Fetch installer script at target URL.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetch installer scripts over HTTP(S) through reqwest.
///
/// Download progress is displayed through a progress bar.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    bar: ProgressBar,
}

impl HttpFetcher {
    /// Construct new HTTP fetcher.
    ///
    /// # Errors
    ///
    /// - Return [`ToolchainError::Http`] if HTTP client cannot be built.
    pub fn new(bar: ProgressBar) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("pushdock/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, bar })
    }
}

impl InstallerFetch for HttpFetcher {
    #[instrument(skip(self), level = "debug")]
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let style = ProgressStyle::with_template(
            "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}]",
        )?
        .progress_chars("-Cco.");
        self.bar.set_style(style);
        self.bar.set_message(url.to_string());
        self.bar.enable_steady_tick(Duration::from_millis(100));

        let mut response = self.client.get(url).send()?.error_for_status()?;
        if let Some(length) = response.content_length() {
            self.bar.set_length(length);
        }

        let mut script = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            let read = response
                .read(&mut chunk)
                .map_err(|source| ToolchainError::Download {
                    source,
                    url: url.to_string(),
                })?;
            if read == 0 {
                break;
            }

            script.extend_from_slice(&chunk[..read]);
            self.bar.set_position(script.len() as u64);
        }
        self.bar.finish_and_clear();

        Ok(script)
    }
}

/// Package manager bootstrap tool.
#[derive(Debug, Clone)]
pub struct Toolchain<F = HttpFetcher>
where
    F: InstallerFetch,
{
    settings: ToolchainSettings,
    fetcher: F,
}

impl<F> Toolchain<F>
where
    F: InstallerFetch,
{
    /// Construct new toolchain bootstrapper.
    pub fn new(settings: ToolchainSettings, fetcher: F) -> Self {
        Self { settings, fetcher }
    }

    /// Known path of toolchain executable.
    pub fn bin_path(&self) -> PathBuf {
        self.settings.bin_path()
    }

    /// Check if toolchain executable is present at its known path.
    pub fn is_installed(&self) -> bool {
        self.bin_path().is_file()
    }

    /// Install toolchain if absent, then persist its PATH export.
    ///
    /// The profile is checked every time, even if the toolchain was already
    /// installed, so a profile that lost its export gets repaired.
    ///
    /// # Errors
    ///
    /// - Return [`ToolchainError::Http`] if installer cannot be fetched.
    /// - Return [`ToolchainError::Installer`] if installer fails.
    /// - Return [`ToolchainError::Missing`] if installer succeeds, but the
    ///   executable still is not at its known path.
    /// - Return [`ToolchainError::Profile`] if shell profile cannot be updated.
    #[instrument(skip(self), level = "debug")]
    pub fn ensure(&self) -> Result<ToolchainStatus> {
        let installed = if self.is_installed() {
            info!("{} already installed at {:?}", self.settings.name, self.bin_path().display());
            false
        } else {
            self.install()?;
            true
        };

        let profile = ShellProfile::new(&self.settings.profile);
        let profile_updated = profile.ensure_line(path_export_line(&self.settings.bin_dir))?;

        Ok(ToolchainStatus {
            installed,
            profile_updated,
        })
    }

    fn install(&self) -> Result<()> {
        info!(
            "install {} through {}",
            self.settings.name, self.settings.install_url
        );
        let script = self.fetcher.fetch(&self.settings.install_url)?;
        syscall_with_stdin("sh", ["-s"], &script)?;

        if !self.is_installed() {
            return Err(ToolchainError::Missing {
                path: self.bin_path(),
            });
        }

        Ok(())
    }
}

/// Toolchain installation error types.
#[derive(Debug, thiserror::Error)]
pub enum ToolchainError {
    /// Installer cannot be requested.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Installer download is cut short.
    #[error("failed to download installer from {url}")]
    Download {
        #[source]
        source: std::io::Error,
        url: String,
    },

    /// Installer script fails.
    #[error(transparent)]
    Installer(#[from] crate::syscall::SyscallError),

    /// Installer claims success, but executable is nowhere to be found.
    #[error("installer finished, but {:?} does not exist", path.display())]
    Missing { path: PathBuf },

    /// Shell profile cannot be updated.
    #[error(transparent)]
    Profile(#[from] crate::provision::profile::ProfileError),

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),

    /// Fetcher specific failure.
    #[error("failed to fetch installer: {0}")]
    Fetch(String),
}

/// Friendly result alias :3
pub type Result<T, E = ToolchainError> = std::result::Result<T, E>;
