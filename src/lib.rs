// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Provision a host as a git push-to-deploy target.
//!
//! Pushdock sets up one project on one host: a bare repository to push to, a
//! post-receive hook that checks pushed commits out into a working tree, and
//! the external tooling the deployed project expects to find.

pub mod config;
pub mod path;
pub mod provision;
pub mod syscall;

pub use crate::{
    config::ProvisionConfig,
    path::{ProjectLayout, ProjectName},
    provision::{ProvisionError, ProvisionReport, Provisioner, Steps},
};
