// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Deployment target provisioning.
//!
//! Provisioning turns a host into a push-to-deploy target for one project. It
//! is one linear procedure:
//!
//! 1. Ensure a bare repository exists for the project.
//! 2. Write a post-receive hook into it, and mark it executable.
//! 3. Ensure the package manager bootstrap tool is installed, and its
//!    directory is exported through the shell profile.
//! 4. Install the global process manager package.
//!
//! Steps run strictly in order. The first failing step aborts provisioning,
//! so no step ever runs on top of a half-finished predecessor.
//!
//! # See Also
//!
//! 1. [`repository`]
//! 2. [`hook`]
//! 3. [`toolchain`]
//! 4. [`dependency`]

pub mod dependency;
pub mod hook;
pub mod profile;
pub mod repository;
pub mod toolchain;

use crate::{
    config::ProvisionConfig,
    path::{ProjectLayout, ProjectName},
    provision::{
        dependency::GlobalPackage,
        hook::PostReceiveHook,
        repository::Bootstrap,
        toolchain::{HttpFetcher, InstallerFetch, Toolchain, ToolchainStatus},
    },
};

use std::path::PathBuf;
use tracing::{info, instrument};

/// Selection of provisioning steps to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Steps {
    pub repository: bool,
    pub hook: bool,
    pub toolchain: bool,
    pub dependency: bool,
}

impl Steps {
    /// Every step.
    pub fn all() -> Self {
        Self {
            repository: true,
            hook: true,
            toolchain: true,
            dependency: true,
        }
    }

    /// Only the steps that set up the push target.
    pub fn push_target() -> Self {
        Self {
            repository: true,
            hook: true,
            toolchain: false,
            dependency: false,
        }
    }
}

impl Default for Steps {
    fn default() -> Self {
        Self::all()
    }
}

/// Summary of what provisioning did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Outcome of repository bootstrap, if run.
    pub repository: Option<Bootstrap>,

    /// Path of installed hook, if run.
    pub hook: Option<PathBuf>,

    /// Outcome of toolchain step, if run.
    pub toolchain: Option<ToolchainStatus>,

    /// Whether global dependency was installed.
    pub dependency: bool,
}

/// Provision deployment targets.
#[derive(Debug)]
pub struct Provisioner<F = HttpFetcher>
where
    F: InstallerFetch,
{
    config: ProvisionConfig,
    toolchain: Toolchain<F>,
}

impl<F> Provisioner<F>
where
    F: InstallerFetch,
{
    /// Construct new provisioner.
    pub fn new(config: ProvisionConfig, fetcher: F) -> Self {
        let toolchain = Toolchain::new(config.toolchain.clone(), fetcher);
        Self { config, toolchain }
    }

    pub fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    /// Derive filesystem layout of project.
    pub fn layout(&self, name: ProjectName) -> ProjectLayout {
        ProjectLayout::new(name, &self.config.layout)
    }

    /// Run every provisioning step for project.
    ///
    /// # Errors
    ///
    /// - Return [`ProvisionError`] of the first step that fails.
    pub fn provision(&self, name: ProjectName) -> Result<ProvisionReport> {
        self.run(name, Steps::all())
    }

    /// Run selected provisioning steps for project, in order.
    ///
    /// # Errors
    ///
    /// - Return [`ProvisionError`] of the first step that fails.
    #[instrument(skip(self), level = "debug")]
    pub fn run(&self, name: ProjectName, steps: Steps) -> Result<ProvisionReport> {
        let layout = self.layout(name);
        let mut report = ProvisionReport::default();

        if steps.repository {
            report.repository = Some(self.bootstrap_repository(&layout)?);
        }

        if steps.hook {
            report.hook = Some(self.install_hook(&layout)?);
        }

        if steps.toolchain {
            report.toolchain = Some(self.ensure_toolchain()?);
        }

        if steps.dependency {
            self.install_dependency()?;
            report.dependency = true;
        }

        info!("provisioned {}", layout.name());

        Ok(report)
    }

    /// Ensure bare repository of project exists.
    ///
    /// # Errors
    ///
    /// - Return [`ProvisionError::Repository`] if bootstrap fails.
    pub fn bootstrap_repository(&self, layout: &ProjectLayout) -> Result<Bootstrap> {
        Ok(repository::bootstrap(layout)?)
    }

    /// Write post-receive hook of project.
    ///
    /// # Errors
    ///
    /// - Return [`ProvisionError::Hook`] if hook cannot be installed.
    pub fn install_hook(&self, layout: &ProjectLayout) -> Result<PathBuf> {
        Ok(PostReceiveHook::new(layout).install(layout.hooks_dir())?)
    }

    /// Ensure toolchain is installed and exported.
    ///
    /// # Errors
    ///
    /// - Return [`ProvisionError::Toolchain`] if toolchain step fails.
    pub fn ensure_toolchain(&self) -> Result<ToolchainStatus> {
        Ok(self.toolchain.ensure()?)
    }

    /// Install global dependency.
    ///
    /// # Errors
    ///
    /// - Return [`ProvisionError::Dependency`] if installation fails.
    pub fn install_dependency(&self) -> Result<()> {
        Ok(GlobalPackage::new(self.config.dependency.clone()).install()?)
    }
}

/// Provisioning error types.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// Bare repository cannot be bootstrapped.
    #[error(transparent)]
    Repository(#[from] crate::provision::repository::RepositoryError),

    /// Post-receive hook cannot be installed.
    #[error(transparent)]
    Hook(#[from] crate::provision::hook::HookError),

    /// Toolchain cannot be installed.
    #[error(transparent)]
    Toolchain(#[from] crate::provision::toolchain::ToolchainError),

    /// Global dependency cannot be installed.
    #[error(transparent)]
    Dependency(#[from] crate::provision::dependency::DependencyError),
}

/// Friendly result alias :3
type Result<T, E = ProvisionError> = std::result::Result<T, E>;
