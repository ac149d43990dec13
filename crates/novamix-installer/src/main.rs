//! Novamix - installs the Arctis Nova Pro ChatMix helper for the current user.
//!
//! `install` grants device access through a udev rule, places the helper in
//! the user's bin directory and registers it with the user service manager;
//! `uninstall` reverses all of it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use directories::BaseDirs;
use novamix_core::unit::exec_start_path;
use novamix_core::{
    HotplugRule, Layout, Operation, OverwritePolicy, Plan, Runner, ServiceUnit, StepOutcome,
};
use novamix_host::HostSystem;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod prompt;
mod status;

use config::{Config, ConfigSource};
use prompt::TerminalConfirm;
use status::StatusReport;

#[derive(Parser)]
#[command(name = "novamix", version, about = "Install the Arctis Nova Pro ChatMix helper")]
struct Cli {
    /// Configuration file (default: ~/.config/novamix/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the steps without running them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the device rule, helper binary and user service
    Install {
        /// What to do when the helper is already installed
        #[arg(long, value_enum)]
        overwrite: Option<OverwriteArg>,
    },
    /// Stop the service and remove everything install placed
    Uninstall,
    /// Show what is installed and whether a base station is attached
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print or write a generated artifact
    Render {
        #[arg(value_enum)]
        artifact: RenderTarget,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OverwriteArg {
    Prompt,
    Always,
    Never,
}

impl From<OverwriteArg> for OverwritePolicy {
    fn from(arg: OverwriteArg) -> Self {
        match arg {
            OverwriteArg::Prompt => Self::PromptCaller,
            OverwriteArg::Always => Self::AlwaysOverwrite,
            OverwriteArg::Never => Self::NeverOverwrite,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RenderTarget {
    Rule,
    Unit,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, source) = config::load_config(cli.config.as_deref())?;

    let level = if cli.verbose { "debug" } else { config.logging.log_level.as_str() };
    let mut filter = EnvFilter::from_default_env();
    for directive in log_directives(level) {
        filter = filter.add_directive(directive.parse()?);
    }
    tracing_subscriber::fmt().with_writer(std::io::stderr).with_env_filter(filter).init();

    debug!(version = env!("CARGO_PKG_VERSION"), "Starting novamix");
    match &source {
        ConfigSource::File(path) => info!(?path, "Configuration loaded"),
        ConfigSource::Defaults(path) => debug!(?path, "Config file not found, using defaults"),
    }

    let base = BaseDirs::new().context("Could not determine home directory")?;
    let layout = Layout::new(&config.sources(), &config.install_dirs(&base));

    match cli.command {
        Commands::Install { overwrite } => {
            let policy = overwrite.map_or(config.install.overwrite, OverwritePolicy::from);
            check_descriptor_target(&layout, base.home_dir());
            run_operation(Operation::Install, &config, &layout, base.home_dir(), policy, cli.dry_run)
        }
        Commands::Uninstall => run_operation(
            Operation::Uninstall,
            &config,
            &layout,
            base.home_dir(),
            config.install.overwrite,
            cli.dry_run,
        ),
        Commands::Status { json } => {
            let system = host_system(&config, &layout, base.home_dir());
            let report = StatusReport::collect(&system, &layout)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render());
            }
            Ok(())
        }
        Commands::Render { artifact, output } => {
            let text = match artifact {
                RenderTarget::Rule => HotplugRule::default().render(),
                RenderTarget::Unit => ServiceUnit {
                    exec_start: exec_start_for(&layout.binary.target, base.home_dir()),
                    ..ServiceUnit::default()
                }
                .render(),
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, text)
                        .with_context(|| format!("Failed to write {path:?}"))?;
                    info!(?path, "Artifact written");
                }
                None => print!("{text}"),
            }
            Ok(())
        }
    }
}

/// Filter directives giving every novamix crate the same level.
fn log_directives(level: &str) -> [String; 3] {
    ["novamix_installer", "novamix_core", "novamix_host"].map(|target| format!("{target}={level}"))
}

fn host_system(config: &Config, layout: &Layout, home: &Path) -> HostSystem {
    let unit_dir = layout
        .descriptor
        .target
        .parent()
        .map_or_else(|| home.join(".config/systemd/user"), Path::to_path_buf);
    HostSystem::new(config.install.escalation, home.to_path_buf(), unit_dir)
}

fn run_operation(
    operation: Operation,
    config: &Config,
    layout: &Layout,
    home: &Path,
    policy: OverwritePolicy,
    dry_run: bool,
) -> Result<()> {
    let plan = Plan::for_operation(operation);

    if dry_run {
        println!("{operation} plan:");
        for (i, step) in plan.steps().iter().enumerate() {
            let privileged = if step.is_privileged() { " [privileged]" } else { "" };
            println!("  {}. {step}{privileged}", i + 1);
        }
        return Ok(());
    }

    let mut system = host_system(config, layout, home);
    let mut confirm = TerminalConfirm;
    let report = Runner::new(&mut system, layout, policy, &mut confirm)
        .run(&plan)
        .with_context(|| format!("{operation} did not complete; re-run to finish"))?;

    for record in &report.records {
        if let StepOutcome::Skipped(reason) = record.outcome {
            println!("skipped: {} ({reason:?})", record.step);
        }
    }
    println!("{operation} complete: service {}", report.final_state);
    Ok(())
}

/// `ExecStart=` value for a helper installed at `target`, using `%h` when
/// it lives under the home directory.
fn exec_start_for(target: &Path, home: &Path) -> String {
    match target.strip_prefix(home) {
        Ok(relative) => format!("%h/{}", relative.display()),
        Err(_) => target.display().to_string(),
    }
}

/// Warn when the bundled descriptor would start something other than the
/// binary this install places.
fn check_descriptor_target(layout: &Layout, home: &Path) {
    let Ok(contents) = std::fs::read_to_string(&layout.descriptor.source) else {
        return;
    };
    match exec_start_path(&contents, home) {
        Some(exec) if exec != layout.binary.target => warn!(
            ?exec,
            binary = ?layout.binary.target,
            "Service descriptor starts a different path than the installed helper"
        ),
        Some(_) => {}
        None => warn!(descriptor = ?layout.descriptor.source, "Service descriptor has no ExecStart="),
    }
}
