//! QoS-over-LLDP controller CLI
//!
//! Loads a network snapshot (links, hosts and captured LLDP frames), ingests
//! it and answers one query as JSON.
//!
//! # Usage
//!
//! ```bash
//! qolctl --snapshot net.json qos --view visual s1-eth3
//! qolctl --snapshot net.json history s1-eth3 visualbandwidth
//! qolctl --snapshot net.json route bandwidth h1 h3 --with aggregate
//! qolctl --snapshot net.json k-routes delay h1 h4 3
//! qolctl apis
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use qol_common::{DeviceKey, SwitchId};
use qol_controller::{
    apis, ControllerConfig, ControllerError, ControllerResult, QolController, QosView, Snapshot,
};
use qol_route::{Endpoint, Policy, StaticTopology};
use qol_telemetry::Metric;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod output;

#[derive(Parser)]
#[command(name = "qolctl")]
#[command(version)]
#[command(about = "QoS-over-LLDP controller", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, short, env = "QOL_CONFIG")]
    config: Option<PathBuf>,

    /// Network snapshot (JSON)
    #[arg(long, short, env = "QOL_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Override history capacity
    #[arg(long)]
    history_capacity: Option<usize>,

    /// Override history display size
    #[arg(long)]
    display_size: Option<usize>,

    /// Output format
    #[arg(long, short, default_value = "pretty")]
    format: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Augment {
    Qos,
    Aggregate,
}

#[derive(Subcommand)]
enum Commands {
    /// Current QoS of one port or all ports
    Qos {
        /// Device key (`s1-eth3`) or `all`
        #[arg(default_value = "all")]
        device: String,
        /// raw or visual
        #[arg(long, default_value = "raw")]
        view: QosView,
    },
    /// Recent values of one metric for one port
    History { device: DeviceKey, metric: Metric },
    /// Best route under a policy
    Route {
        policy: Policy,
        src: Endpoint,
        dst: Endpoint,
        /// Attach per-port QoS or a whole-path aggregate
        #[arg(long = "with")]
        augment: Option<Augment>,
    },
    /// Up to k routes under a policy
    KRoutes {
        policy: Policy,
        src: Endpoint,
        dst: Endpoint,
        k: usize,
    },
    /// Fewest-hops route
    Shortest { src: Endpoint, dst: Endpoint },
    /// Fewest-hops routes between every pair
    AllRoutes,
    /// Ports with a sample, per switch
    Ports,
    /// Hex LLDPDU the controller would send out of a port
    Probe { switch: SwitchId, port: u16 },
    /// Ingestion and routing counters
    Stats,
    /// Supported queries
    Apis,
}

/// Configuration plus the reason defaults were used, if they were
fn load_config(path: Option<&PathBuf>) -> anyhow::Result<(ControllerConfig, Option<String>)> {
    let Some(path) = path else {
        return Ok((ControllerConfig::default(), None));
    };
    match ControllerConfig::load(path) {
        Ok(config) => Ok((config, None)),
        Err(ControllerError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok((
            ControllerConfig::default(),
            Some(format!("{} not found", path.display())),
        )),
        Err(e) => Err(e).with_context(|| format!("loading {}", path.display())),
    }
}

/// Exit status when a route query has a "cannot reach" answer
const EXIT_UNSATISFIED: u8 = 2;

/// Print a route answer. Unknown endpoints and unreachable pairs are
/// printed as structured results on stdout; other failures propagate.
fn answer<T: Serialize>(
    out: output::OutputFormat,
    result: ControllerResult<T>,
) -> anyhow::Result<ExitCode> {
    match result {
        Ok(value) => {
            out.print(&value)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => match e.unsatisfied_route() {
            Some(route_error) => {
                out.print(route_error)?;
                Ok(ExitCode::from(EXIT_UNSATISFIED))
            }
            None => Err(e.into()),
        },
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let (config, fallback) = load_config(cli.config.as_ref())?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_filter.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("qolctl v{}", env!("CARGO_PKG_VERSION"));
    if let Some(reason) = fallback {
        tracing::warn!(%reason, "Config not found, using defaults");
    }

    let topology = Arc::new(StaticTopology::new());
    let controller = QolController::new(config, topology.clone(), topology.clone())?;

    // capacity first so a larger display size fits
    if let Some(capacity) = cli.history_capacity {
        controller.set_history_capacity(capacity)?;
    }
    if let Some(display_size) = cli.display_size {
        controller.set_history_display_size(display_size)?;
    }

    if let Some(path) = &cli.snapshot {
        let snapshot = Snapshot::load(path).with_context(|| format!("loading {}", path.display()))?;
        snapshot.install(&topology, &controller)?;
    }

    let out = cli.format;
    let code = match cli.command {
        Commands::Qos { device, view } => {
            let key = match device.as_str() {
                "all" => None,
                other => Some(other.parse::<DeviceKey>()?),
            };
            answer(out, controller.current_qos(view, key.as_ref()))?
        }
        Commands::History { device, metric } => answer(out, Ok(controller.history(&device, metric)))?,
        Commands::Route {
            policy,
            src,
            dst,
            augment,
        } => match augment {
            None => answer(out, controller.route(policy, &src, &dst))?,
            Some(Augment::Qos) => answer(out, controller.route_with_qos(policy, &src, &dst))?,
            Some(Augment::Aggregate) => {
                answer(out, controller.route_with_aggregate(policy, &src, &dst))?
            }
        },
        Commands::KRoutes { policy, src, dst, k } => {
            answer(out, controller.k_routes(policy, &src, &dst, k))?
        }
        Commands::Shortest { src, dst } => answer(out, controller.shortest_route(&src, &dst))?,
        Commands::AllRoutes => answer(out, controller.all_routes())?,
        Commands::Ports => answer(out, Ok(controller.ports_by_switch()))?,
        Commands::Probe { switch, port } => {
            answer(out, controller.probe_frame(switch, port).map(hex::encode))?
        }
        Commands::Stats => answer(out, Ok(controller.stats()))?,
        Commands::Apis => answer(out, Ok(apis()))?,
    };

    Ok(code)
}
