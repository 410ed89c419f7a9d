// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use pushdock::{
    config::ProvisionConfig,
    path::{default_config_path, ProjectName},
    provision::{hook::PostReceiveHook, toolchain::HttpFetcher, Provisioner, Steps},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use std::{fs::read_to_string, path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "pushdock [options] <pushdock-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let config = load_config(self.config)?;
        let provisioner = Provisioner::new(config, HttpFetcher::new(ProgressBar::new(0))?);

        match self.command {
            Command::Provision(opts) => run_provision(&provisioner, opts),
            Command::Init(opts) => run_init(&provisioner, opts),
            Command::Hook(opts) => run_hook(&provisioner, opts),
            Command::Toolchain => run_toolchain(&provisioner),
            Command::Dependency => run_dependency(&provisioner),
            Command::Layout(opts) => run_layout(&provisioner, opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Provision deployment target for project in full.
    #[command(override_usage = "pushdock provision [options] <project>")]
    Provision(ProvisionOptions),

    /// Create bare repository and post-receive hook only.
    #[command(override_usage = "pushdock init [options] <project>")]
    Init(ProjectOptions),

    /// Reinstall post-receive hook, or print it.
    #[command(override_usage = "pushdock hook [options] <project>")]
    Hook(HookOptions),

    /// Ensure package manager bootstrap tool is installed.
    #[command(override_usage = "pushdock toolchain [options]")]
    Toolchain,

    /// Install global process manager package.
    #[command(override_usage = "pushdock dependency [options]")]
    Dependency,

    /// Show paths derived for project.
    #[command(override_usage = "pushdock layout [options] <project>")]
    Layout(ProjectOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ProvisionOptions {
    /// Name of project to provision.
    #[arg(value_name = "project")]
    pub project: ProjectName,

    /// Skip toolchain installation.
    #[arg(long)]
    pub skip_toolchain: bool,

    /// Skip global dependency installation.
    #[arg(long)]
    pub skip_dependency: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ProjectOptions {
    /// Name of project.
    #[arg(value_name = "project")]
    pub project: ProjectName,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct HookOptions {
    /// Name of project.
    #[arg(value_name = "project")]
    pub project: ProjectName,

    /// Print hook script instead of installing it.
    #[arg(short, long)]
    pub print: bool,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn load_config(path: Option<PathBuf>) -> Result<ProvisionConfig> {
    let (path, explicit) = match path {
        Some(path) => (path, true),
        None => (default_config_path()?, false),
    };

    // INVARIANT: Only a missing default configuration file means defaults.
    if !explicit && !path.exists() {
        return Ok("".parse::<ProvisionConfig>()?);
    }

    let data = read_to_string(&path)
        .with_context(|| format!("failed to read configuration {:?}", path.display()))?;
    let config = data
        .parse::<ProvisionConfig>()
        .with_context(|| format!("invalid configuration {:?}", path.display()))?;

    Ok(config)
}

fn run_provision(provisioner: &Provisioner, opts: ProvisionOptions) -> Result<()> {
    let mut steps = Steps::all();
    steps.toolchain = !opts.skip_toolchain;
    steps.dependency = !opts.skip_dependency;

    let report = provisioner.run(opts.project, steps)?;
    info!("{report:?}");

    Ok(())
}

fn run_init(provisioner: &Provisioner, opts: ProjectOptions) -> Result<()> {
    provisioner.run(opts.project, Steps::push_target())?;
    Ok(())
}

fn run_hook(provisioner: &Provisioner, opts: HookOptions) -> Result<()> {
    let layout = provisioner.layout(opts.project);
    if opts.print {
        print!("{}", PostReceiveHook::new(&layout));
    } else {
        provisioner.install_hook(&layout)?;
    }

    Ok(())
}

fn run_toolchain(provisioner: &Provisioner) -> Result<()> {
    let status = provisioner.ensure_toolchain()?;
    info!("{status:?}");
    Ok(())
}

fn run_dependency(provisioner: &Provisioner) -> Result<()> {
    provisioner.install_dependency()?;
    Ok(())
}

fn run_layout(provisioner: &Provisioner, opts: ProjectOptions) -> Result<()> {
    println!("{}", provisioner.layout(opts.project));
    Ok(())
}
