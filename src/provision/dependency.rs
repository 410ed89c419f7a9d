// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Global dependency installation.

use crate::{config::DependencySettings, syscall::syscall_interactive};

use std::ffi::OsString;
use tracing::{info, instrument};

/// Globally installed package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalPackage {
    settings: DependencySettings,
}

impl GlobalPackage {
    /// Construct new global package installer.
    pub fn new(settings: DependencySettings) -> Self {
        Self { settings }
    }

    /// Arguments handed to package manager.
    pub fn install_args(&self) -> Vec<OsString> {
        self.settings
            .install_args
            .iter()
            .chain(std::iter::once(&self.settings.package))
            .map(OsString::from)
            .collect()
    }

    /// Install package through package manager.
    ///
    /// The package manager is located on `PATH` first. Its output goes
    /// straight to the operator.
    ///
    /// # Errors
    ///
    /// - Return [`DependencyError::ManagerNotFound`] if package manager is not
    ///   on `PATH`.
    /// - Return [`DependencyError::Install`] if package manager fails.
    #[instrument(skip(self), level = "debug")]
    pub fn install(&self) -> Result<()> {
        let manager = which::which(&self.settings.manager).map_err(|source| {
            DependencyError::ManagerNotFound {
                source,
                manager: self.settings.manager.clone(),
            }
        })?;

        info!(
            "install {} through {:?}",
            self.settings.package,
            manager.display()
        );
        syscall_interactive(&manager, self.install_args())?;

        Ok(())
    }
}

/// Dependency installation error types.
#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    /// Package manager cannot be found.
    #[error("package manager {manager:?} not found on PATH")]
    ManagerNotFound {
        #[source]
        source: which::Error,
        manager: String,
    },

    /// Package manager fails.
    #[error(transparent)]
    Install(#[from] crate::syscall::SyscallError),
}

/// Friendly result alias :3
type Result<T, E = DependencyError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syscall::SyscallError;
    use pretty_assertions::assert_eq;

    fn package(manager: &str) -> GlobalPackage {
        GlobalPackage::new(DependencySettings {
            manager: manager.into(),
            ..DependencySettings::default()
        })
    }

    #[test]
    fn default_install_args() {
        let result = package("npm").install_args();
        let expect: Vec<OsString> = vec!["install".into(), "--global".into(), "pm2".into()];
        assert_eq!(result, expect);
    }

    #[test]
    fn missing_manager_is_reported() {
        let result = package("pushdock-no-such-package-manager").install();
        assert!(matches!(
            result,
            Err(DependencyError::ManagerNotFound { .. })
        ));
    }

    #[test]
    fn manager_exit_status_propagates() {
        assert!(package("true").install().is_ok());

        let result = package("false").install();
        match result {
            Err(DependencyError::Install(SyscallError::Failed { status, .. })) => {
                assert_eq!(status.code(), Some(1));
            }
            other => panic!("expected install failure, got {other:?}"),
        }
    }
}
