// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for the configuration file that pushdock uses to
//! simplify the process of serialization and deserialization. File I/O is left
//! to the caller to figure out.
//!
//! # General Layout
//!
//! The configuration file is composed of three sections: layout, toolchain,
//! and dependency. Every section and every key is optional. Missing keys fall
//! back to their defaults, so an empty file is a perfectly valid
//! configuration.
//!
//! ```toml
//! [layout]
//! repo_root = "/var/repo"
//! work_root = "/var/opt"
//! branch = "main"
//!
//! [toolchain]
//! name = "uv"
//! install_url = "https://astral.sh/uv/install.sh"
//! bin_dir = "~/.local/bin"
//! profile = "~/.bashrc"
//!
//! [dependency]
//! manager = "npm"
//! package = "pm2"
//! install_args = ["install", "--global"]
//! ```

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Full provisioning configuration.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisionConfig {
    /// Where repositories and working trees live.
    pub layout: LayoutSettings,

    /// Package manager bootstrap tool to install.
    pub toolchain: ToolchainSettings,

    /// Global package to install through a Node package manager.
    pub dependency: DependencySettings,
}

impl FromStr for ProvisionConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: ProvisionConfig =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        config.layout.repo_root = expand_path(&config.layout.repo_root)?;
        config.layout.work_root = expand_path(&config.layout.work_root)?;
        config.toolchain.bin_dir = expand_path(&config.toolchain.bin_dir)?;
        config.toolchain.profile = expand_path(&config.toolchain.profile)?;

        // INVARIANT: Deploy branch ends up on git's command line inside the hook.
        validate_branch(&config.layout.branch)?;

        Ok(config)
    }
}

impl Display for ProvisionConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Repository layout settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutSettings {
    /// Directory housing bare repositories.
    pub repo_root: PathBuf,

    /// Directory housing working trees.
    pub work_root: PathBuf,

    /// Branch to deploy on push.
    pub branch: String,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            repo_root: PathBuf::from("/var/repo"),
            work_root: PathBuf::from("/var/opt"),
            branch: "main".into(),
        }
    }
}

/// Toolchain bootstrap settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainSettings {
    /// Name of executable the installer provides.
    pub name: String,

    /// URL of official installer script.
    pub install_url: String,

    /// Directory the installer places the executable into.
    pub bin_dir: PathBuf,

    /// Shell profile to persist PATH export into.
    pub profile: PathBuf,
}

impl ToolchainSettings {
    /// Known path of toolchain executable.
    pub fn bin_path(&self) -> PathBuf {
        self.bin_dir.join(&self.name)
    }
}

impl Default for ToolchainSettings {
    fn default() -> Self {
        Self {
            name: "uv".into(),
            install_url: "https://astral.sh/uv/install.sh".into(),
            bin_dir: PathBuf::from("~/.local/bin"),
            profile: PathBuf::from("~/.bashrc"),
        }
    }
}

/// Global dependency settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DependencySettings {
    /// Package manager executable.
    pub manager: String,

    /// Package to install globally.
    pub package: String,

    /// Arguments placed before package name.
    pub install_args: Vec<String>,
}

impl Default for DependencySettings {
    fn default() -> Self {
        Self {
            manager: "npm".into(),
            package: "pm2".into(),
            install_args: vec!["install".into(), "--global".into()],
        }
    }
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
}

fn validate_branch(branch: &str) -> Result<()> {
    let valid = !branch.is_empty()
        && !branch.starts_with('-')
        && !branch.chars().any(char::is_control)
        && git2::Reference::is_valid_name(format!("refs/heads/{branch}").as_str());

    if !valid {
        return Err(ConfigError::InvalidBranch {
            branch: branch.to_string(),
        });
    }

    Ok(())
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Deploy branch is not a usable branch name.
    #[error("invalid deploy branch {branch:?}")]
    InvalidBranch { branch: String },
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use simple_test_case::test_case;

    #[sealed_test(env = [("HOME", "/home/deploy"), ("SRV", "/srv")])]
    fn deserialize_provision_config() -> anyhow::Result<()> {
        let result: ProvisionConfig = r#"
            [layout]
            repo_root = "$SRV/repo"
            work_root = "$SRV/opt"
            branch = "production"

            [toolchain]
            name = "uv"
            install_url = "https://example.org/install.sh"
            bin_dir = "~/bin"
            profile = "~/.profile"

            [dependency]
            manager = "pnpm"
            package = "pm2"
            install_args = ["add", "--global"]
        "#
        .parse()?;

        let expect = ProvisionConfig {
            layout: LayoutSettings {
                repo_root: PathBuf::from("/srv/repo"),
                work_root: PathBuf::from("/srv/opt"),
                branch: "production".into(),
            },
            toolchain: ToolchainSettings {
                name: "uv".into(),
                install_url: "https://example.org/install.sh".into(),
                bin_dir: PathBuf::from("/home/deploy/bin"),
                profile: PathBuf::from("/home/deploy/.profile"),
            },
            dependency: DependencySettings {
                manager: "pnpm".into(),
                package: "pm2".into(),
                install_args: vec!["add".into(), "--global".into()],
            },
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[sealed_test(env = [("HOME", "/home/deploy")])]
    fn empty_config_uses_expanded_defaults() -> anyhow::Result<()> {
        let result: ProvisionConfig = "".parse()?;

        assert_eq!(result.layout, LayoutSettings::default());
        assert_eq!(result.dependency, DependencySettings::default());
        assert_eq!(
            result.toolchain.bin_path(),
            PathBuf::from("/home/deploy/.local/bin/uv")
        );
        assert_eq!(
            result.toolchain.profile,
            PathBuf::from("/home/deploy/.bashrc")
        );

        Ok(())
    }

    #[sealed_test(env = [("HOME", "/home/deploy")])]
    fn partial_section_keeps_other_defaults() -> anyhow::Result<()> {
        let result: ProvisionConfig = r#"
            [layout]
            branch = "release"
        "#
        .parse()?;

        assert_eq!(result.layout.branch, "release");
        assert_eq!(result.layout.repo_root, PathBuf::from("/var/repo"));
        assert_eq!(result.layout.work_root, PathBuf::from("/var/opt"));

        Ok(())
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = r#"
            [layout]
            repo_rot = "/var/repo"
        "#
        .parse::<ProvisionConfig>();

        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[sealed_test(env = [("HOME", "/home/deploy")])]
    fn serialized_config_parses_back() -> anyhow::Result<()> {
        let expect: ProvisionConfig = "".parse()?;
        let result: ProvisionConfig = expect.to_string().parse()?;

        assert_eq!(result, expect);

        Ok(())
    }

    #[test_case(""; "empty")]
    #[test_case("-x"; "leading dash")]
    #[test_case("bad..name"; "double dot")]
    #[test_case("has space"; "space")]
    #[test_case("topic.lock"; "lock suffix")]
    #[test]
    fn invalid_branch_is_rejected(branch: &str) {
        let result = format!("[layout]\nbranch = {branch:?}\n").parse::<ProvisionConfig>();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidBranch { branch: rejected }) if rejected == branch
        ));
    }

    #[test_case("main"; "plain")]
    #[test_case("release/v1"; "nested")]
    #[test]
    fn valid_branch_is_accepted(branch: &str) -> anyhow::Result<()> {
        let config: ProvisionConfig = format!("[layout]\nbranch = {branch:?}\n").parse()?;
        pretty_assertions::assert_eq!(config.layout.branch, branch);

        Ok(())
    }
}
