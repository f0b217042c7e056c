//! synth-flow: build and run an effort-profiled synthesis flow
//!
//! # Usage
//!
//! ```bash
//! # High-effort flow over a generated design
//! synth-flow run --effort high --cells 256 --nets 128
//!
//! # Abort on the first unroutable net, keep the JSON report
//! synth-flow run --effort medium --design chip.json --zero-tolerance --report run.json
//!
//! # Show the phase tables of every known profile
//! synth-flow profiles --config synth-flow.toml
//! ```

mod config;
mod telemetry;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use orchestrator::{
    ConfigOverrides, FailurePolicy, FlowDirector, Phase, ProfileFlowBuilder, RegistryCell,
    StageKind,
};
use tracing::info;

use config::DesignSource;
use telemetry::{DesignSnapshot, RunArtifact};

/// Exit status when the flow ran but aborted
const EXIT_ABORTED: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "synth-flow", version, about = "Effort-profiled synthesis flow runner")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a flow for an effort profile and run it
    Run(RunArgs),
    /// List known effort profiles and their phase tables
    Profiles {
        /// Path to config TOML (defaults to ./synth-flow.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Effort profile name (low, medium, high, or a custom profile)
    #[arg(long, default_value = "medium")]
    effort: String,

    /// Path to config TOML (defaults to ./synth-flow.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON design to run against
    #[arg(long, conflicts_with_all = ["cells", "nets"])]
    design: Option<PathBuf>,

    /// Cell count of the generated design
    #[arg(long, default_value_t = 64)]
    cells: u32,

    /// Net count of the generated design
    #[arg(long, default_value_t = 32)]
    nets: u32,

    /// Abort the flow when any net stays unrouted (overrides SYNTH_FAILURE_POLICY)
    #[arg(long, default_value_t = false)]
    zero_tolerance: bool,

    /// Drop the ILP routing tier (overrides SYNTH_ILP_ENABLED)
    #[arg(long, default_value_t = false)]
    no_ilp: bool,

    /// Write the JSON run report here
    #[arg(long)]
    report: Option<PathBuf>,
}

impl RunArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            failure_policy: self.zero_tolerance.then_some(FailurePolicy::ZeroTolerance),
            ilp_enabled: self.no_ilp.then_some(false),
        }
    }

    fn design_source(&self) -> DesignSource {
        match &self.design {
            Some(path) => DesignSource::File(path.clone()),
            None => DesignSource::Synthetic {
                cells: self.cells,
                nets: self.nets,
            },
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Profiles { config } => {
            list_profiles(config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run(args: RunArgs) -> Result<ExitCode> {
    let mut config = config::load_config(args.config.as_deref())?;
    config.apply_overrides(&args.overrides());

    let profiles = config.profile_set()?;
    let profile = profiles.get(&args.effort)?.clone();
    info!(
        profile = %profile.name,
        steps = profile.total_steps(),
        policy = %config.failure_policy,
        ilp = config.routing.ilp_enabled,
        "synth-flow starting"
    );

    let registry = RegistryCell::new(config.routing.clone());
    let builder = ProfileFlowBuilder::new(profile, registry.get())
        .with_failure_policy(config.failure_policy);
    let mut director = FlowDirector::new(Box::new(builder));
    let mut flow = director.create_flow().context("failed to build flow")?;

    let mut design = config::load_design(&args.design_source())?;
    let report = flow.run(&mut design)?;

    let escalation = registry.get().escalation_stats(StageKind::DetailedRouting)?;
    let artifact = RunArtifact {
        report: &report,
        design: DesignSnapshot::from(&design),
        escalation: escalation.as_ref(),
    };
    print!("{}", telemetry::render_report(&artifact));

    if let Some(path) = &args.report {
        telemetry::write_report(&artifact, path)?;
    }

    if report.is_completed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_ABORTED))
    }
}

fn list_profiles(config_path: Option<PathBuf>) -> Result<()> {
    let config = config::load_config(config_path.as_deref())?;
    for profile in config.profile_set()?.iter() {
        println!("{} ({} steps)", profile.name, profile.total_steps());
        for phase in Phase::ORDER {
            let stages: Vec<String> = profile
                .expand(phase)
                .iter()
                .map(|s| s.to_string())
                .collect();
            println!("  {:<11} {}", phase.to_string(), stages.join(" → "));
        }
    }
    Ok(())
}
