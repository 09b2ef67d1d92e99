//! fleetmtc daemon entry point and operator CLI.
//!
//! # Quick Start
//!
//! ```bash
//! # Validate a config file without starting anything
//! fleetmtcd config check /etc/fleetmtc/fleetmtc.conf
//!
//! # Run the maintenance controller daemon
//! fleetmtcd run --self-host controller-0 --simplex
//!
//! # Request an admin action against a provisioned host (talks to the
//! # running daemon's admin socket in a full build; this CLI issues it
//! # directly against a freshly constructed controller for now)
//! fleetmtcd host unlock compute-0
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use fleetmtc::{BaseUrls, MaintenanceController};
use fleetmtc_config::{load_default, load_from_file, ConfigLoader, FleetmtcConfig};
use fleetmtc_io::{CredentialWatch, IoSources, NetlinkListener, UdpEndpoint};
use fleetmtc_types::{AdminAction, HostName};

/// fleetmtc - host lifecycle maintenance controller for a compute cluster.
#[derive(Parser)]
#[command(name = "fleetmtcd")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the INI config file. Falls back to
    /// `/etc/fleetmtc/fleetmtc.conf`, then compiled-in defaults, if absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the maintenance controller's main loop.
    Run {
        /// This node's own host name, used for active/standby tracking.
        #[arg(long)]
        self_host: String,

        /// Single-controller deployment (no peer, no Swact, slower tick).
        #[arg(long)]
        simplex: bool,

        /// Management-network interface address to bind the mtcAgent UDP
        /// socket to.
        #[arg(long, default_value = "0.0.0.0")]
        mgmnt_address: IpAddr,

        /// Cluster-host network interface address, if this deployment has
        /// a separate cluster-host network. Omit to run management-only.
        #[arg(long)]
        clstr_address: Option<IpAddr>,

        /// sysinv (inventory) base URL.
        #[arg(long, default_value = "http://controller:6385")]
        sysinv_url: String,

        /// HA manager (SM API) base URL.
        #[arg(long, default_value = "http://controller:2112")]
        ha_manager_url: String,

        /// VIM base URL.
        #[arg(long, default_value = "http://controller:4545")]
        vim_url: String,

        /// Fault manager base URL.
        #[arg(long, default_value = "http://controller:18002")]
        fm_url: String,
    },

    /// Configuration commands.
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Host lifecycle / admin action commands. These construct a local
    /// controller instance rather than talking to a running daemon — a
    /// real deployment would route these through the admin socket a full
    /// build's `run` loop exposes.
    Host(HostCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Load and validate a config file (or the default search path),
    /// printing the merged, effective configuration.
    Check {
        /// Path to check. Defaults to the compiled-in default path.
        path: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum HostCommands {
    /// Request an admin action against a host: unlock, lock, force-lock,
    /// reboot, reset, reinstall, power-on, power-off, or swact.
    Action {
        /// Host name.
        host: String,

        /// One of: unlock, lock, force-lock, reboot, reset, reinstall,
        /// power-on, power-off, swact.
        action: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            self_host,
            simplex,
            mgmnt_address,
            clstr_address,
            sysinv_url,
            ha_manager_url,
            vim_url,
            fm_url,
        } => run(
            config,
            self_host,
            simplex,
            mgmnt_address,
            clstr_address,
            BaseUrls {
                sysinv: sysinv_url,
                ha_manager: ha_manager_url,
                vim: vim_url,
                fm: fm_url,
            },
        ),
        Commands::Config(ConfigCommands::Check { path }) => config_check(path),
        Commands::Host(HostCommands::Action { host, action }) => host_action(config, host, action),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<FleetmtcConfig> {
    match path {
        Some(path) => load_from_file(path).with_context(|| format!("loading config from {}", path.display())),
        None => load_default().context("loading default fleetmtc configuration"),
    }
}

fn config_check(path: Option<PathBuf>) -> Result<()> {
    let config = match path {
        Some(path) => load_from_file(&path).with_context(|| format!("config file {} failed validation", path.display()))?,
        None => ConfigLoader::new().load().context("default configuration failed validation")?,
    };
    println!("{config:#?}");
    Ok(())
}

/// Runs the daemon's main loop until a termination signal arrives.
///
/// Per spec.md §4.5's tick/dispatch/effects data flow: construct the I/O
/// sources, build the controller, loop `tick()` until `signal-hook`'s flag
/// is set by SIGTERM/SIGINT.
fn run(
    config: FleetmtcConfig,
    self_host: String,
    simplex: bool,
    mgmnt_address: IpAddr,
    clstr_address: Option<IpAddr>,
    base_urls: BaseUrls,
) -> Result<()> {
    let self_host = HostName::from(self_host.as_str());

    let mgmnt_udp = UdpEndpoint::bind(SocketAddr::new(mgmnt_address, config.client.mtc_rx_mgmnt_port), 1 << 20)
        .context("binding management-network UDP socket")?;
    let cluster_udp = clstr_address
        .map(|addr| UdpEndpoint::bind(SocketAddr::new(addr, config.client.mtc_rx_clstr_port), 1 << 20))
        .transpose()
        .context("binding cluster-host-network UDP socket")?;
    let netlink = NetlinkListener::connect().context("opening netlink link-state listener")?;
    let credential_watch = CredentialWatch::new("/etc/shadow").context("watching credential file")?;
    let io = IoSources::new(mgmnt_udp, cluster_udp, netlink, credential_watch).context("wiring up I/O sources")?;

    let mut controller = MaintenanceController::new(config, self_host, base_urls, simplex, Some(io))
        .context("constructing maintenance controller")?;
    controller.evaluate_dor_window(0);

    let shutdown = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, shutdown.clone())
        .context("registering SIGTERM handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, shutdown.clone())
        .context("registering SIGINT handler")?;

    info!("fleetmtc maintenance controller starting");
    while !shutdown.load(std::sync::atomic::Ordering::Relaxed) {
        if let Err(e) = controller.tick() {
            warn!(error = %e, "tick failed");
        }
    }
    info!("fleetmtc maintenance controller shutting down");

    Ok(())
}

fn host_action(config: FleetmtcConfig, host: String, action: String) -> Result<()> {
    let action = parse_admin_action(&action)?;
    let base_urls = BaseUrls {
        sysinv: "http://controller:6385".to_string(),
        ha_manager: "http://controller:2112".to_string(),
        vim: "http://controller:4545".to_string(),
        fm: "http://controller:18002".to_string(),
    };
    let mut controller = MaintenanceController::new(
        config,
        HostName::from("controller-0"),
        base_urls,
        true,
        None,
    )
    .context("constructing maintenance controller")?;

    let name = HostName::from(host.as_str());
    if controller.inventory().get(&name).is_none() {
        let bmc_host = fleetmtc_inventory::Host::new(
            name.clone(),
            fleetmtc_types::HostUuid::generate(),
            IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            fleetmtc_types::NodeType::WORKER,
        );
        controller
            .add_host(bmc_host, |_req| (fleetmtc_bmc::BmcStatus::Retry, "no BMC transport configured for ad-hoc CLI requests".to_string()))
            .context("adding host to local inventory")?;
    }

    controller.request_admin_action(&name, action);
    info!(host = %name, action = ?action, "admin action requested");
    Ok(())
}

fn parse_admin_action(raw: &str) -> Result<AdminAction> {
    Ok(match raw {
        "unlock" => AdminAction::Unlock,
        "lock" => AdminAction::Lock,
        "force-lock" => AdminAction::ForceLock,
        "reboot" => AdminAction::Reboot,
        "reset" => AdminAction::Reset,
        "reinstall" => AdminAction::Reinstall,
        "power-on" => AdminAction::PowerOn,
        "power-off" => AdminAction::PowerOff,
        "swact" => AdminAction::Swact,
        other => anyhow::bail!("unrecognized admin action '{other}'"),
    })
}
