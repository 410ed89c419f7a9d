// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT


use anyhow::Result;
use git2::{IndexEntry, IndexTime, Repository, RepositoryInitOptions};
use pushdock::{
    config::{DependencySettings, LayoutSettings, ProvisionConfig, ToolchainSettings},
    provision::toolchain::{InstallerFetch, ToolchainError},
    syscall::syscall_non_interactive,
};
use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

/// Developer side repository that pushes to a provisioned target.
pub(crate) struct RepoFixture {
    repo: Repository,
}

impl RepoFixture {
    pub(crate) fn new(path: impl AsRef<Path>) -> Result<Self> {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(path.as_ref(), &opts)?;

        // INVARIANT: Always provide valid name and email.
        //   - Git will complain if this is not set in CI/CD environments.
        let mut config = repo.config()?;
        config.set_str("user.name", "John Doe")?;
        config.set_str("user.email", "john@doe.com")?;

        Ok(Self { repo })
    }

    pub(crate) fn stage_and_commit(
        &self,
        filename: impl AsRef<Path>,
        contents: impl AsRef<str>,
    ) -> Result<()> {
        let entry = IndexEntry {
            ctime: IndexTime::new(0, 0),
            mtime: IndexTime::new(0, 0),
            dev: 0,
            ino: 0,
            mode: 0o100644,
            uid: 0,
            gid: 0,
            file_size: contents.as_ref().len() as u32,
            id: self.repo.blob(contents.as_ref().as_bytes())?,
            flags: 0,
            flags_extended: 0,
            path: filename
                .as_ref()
                .as_os_str()
                .to_string_lossy()
                .into_owned()
                .into_bytes(),
        };

        let mut index = self.repo.index()?;
        index.add_frombuffer(&entry, contents.as_ref().as_bytes())?;
        index.write()?;

        self.commit(format!("chore: add {:?}", filename.as_ref()))
    }

    pub(crate) fn remove_and_commit(&self, filename: impl AsRef<Path>) -> Result<()> {
        let mut index = self.repo.index()?;
        index.remove_path(filename.as_ref())?;
        index.write()?;

        self.commit(format!("chore: remove {:?}", filename.as_ref()))
    }

    /// Push main branch through the git binary, so receiving hooks run.
    pub(crate) fn push(&self, target: impl AsRef<Path>, refspec: &str) -> Result<String> {
        let workdir = self.repo.workdir().unwrap_or(self.repo.path());
        let args: Vec<OsString> = vec![
            "-C".into(),
            workdir.into(),
            "push".into(),
            target.as_ref().into(),
            refspec.into(),
        ];
        let output = syscall_non_interactive("git", args)?;

        Ok(output)
    }

    fn commit(&self, message: String) -> Result<()> {
        // INVARIANT: Always use new tree produced by index after staging.
        let mut index = self.repo.index()?;
        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;

        // INVARIANT: Always determine latest parent commits to append to.
        let signature = self.repo.signature()?;
        let mut parents = Vec::new();
        if let Some(parent) = self.repo.head().ok().and_then(|head| head.target()) {
            parents.push(self.repo.find_commit(parent)?);
        }
        let parents = parents.iter().collect::<Vec<_>>();

        self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message.as_str(),
            &tree,
            &parents,
        )?;

        Ok(())
    }
}

/// Fetcher standing in for an unreachable network.
#[derive(Debug, Default)]
pub(crate) struct UnreachableFetcher;

impl InstallerFetch for UnreachableFetcher {
    fn fetch(&self, url: &str) -> pushdock::provision::toolchain::Result<Vec<u8>> {
        Err(ToolchainError::Fetch(format!("{url} is unreachable")))
    }
}

/// Provisioning configuration rooted at target directory.
///
/// The package manager is a script that records its arguments into
/// `<root>/installed`, so tests can tell whether the dependency step ran.
pub(crate) fn sandbox_config(root: impl AsRef<Path>) -> Result<ProvisionConfig> {
    let root = root.as_ref();
    let bin = root.join("bin");
    fs::create_dir_all(&bin)?;

    let manager = bin.join("fake-npm");
    let marker = root.join("installed");
    fs::write(
        &manager,
        format!("#!/bin/sh\necho \"$@\" >> '{}'\n", marker.display()),
    )?;
    make_executable(&manager)?;

    Ok(ProvisionConfig {
        layout: LayoutSettings {
            repo_root: root.join("var/repo"),
            work_root: root.join("var/opt"),
            branch: "main".into(),
        },
        toolchain: ToolchainSettings {
            name: "uv".into(),
            install_url: "https://example.invalid/uv/install.sh".into(),
            bin_dir: root.join("home/.local/bin"),
            profile: root.join("home/.bashrc"),
        },
        dependency: DependencySettings {
            manager: manager.display().to_string(),
            package: "pm2".into(),
            install_args: vec!["install".into(), "--global".into()],
        },
    })
}

/// Pretend toolchain was installed already.
pub(crate) fn preinstall_toolchain(config: &ProvisionConfig) -> Result<PathBuf> {
    let path = config.toolchain.bin_path();
    fs::create_dir_all(&config.toolchain.bin_dir)?;
    fs::write(&path, "#!/bin/sh\n")?;
    make_executable(&path)?;

    Ok(path)
}

fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}
