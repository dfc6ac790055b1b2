//! `dtsd`: the per-node Data Transfer Service daemon (spec §6).
//!
//! Loads the mesh topology, builds a [`daemon::Daemon`] for `--node`,
//! starts one manager loop thread per locally-configured queue, and
//! blocks serving the command-port RPC listener.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use config::Topology;
use daemon::Daemon;
use logging::Verbosity;

/// Command-line arguments (spec §6 Environment: `DTS_CONFIG` names the
/// topology file; `--node` picks which `dts` stanza this process is).
#[derive(Debug, Parser)]
#[command(name = "dtsd", about = "Data Transfer Service daemon")]
struct Args {
    /// Which node (dts stanza) this process runs as.
    #[arg(long)]
    node: String,

    /// Path to the configuration file; overrides `DTS_CONFIG`/`~/.dts_config`.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Enable debug-level logging (overrides the config file's `debug` key).
    #[arg(long)]
    debug: bool,

    /// Enable verbose logging (overrides the config file's `verbose` key).
    #[arg(long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let topology = match load_topology(&args) {
        Ok(topology) => topology,
        Err(err) => {
            eprintln!("dtsd: configuration error: {err}");
            return ExitCode::from(1);
        }
    };

    let verbosity = Verbosity {
        debug: args.debug || topology.global.debug,
        verbose: args.verbose || topology.global.verbose,
    };
    let debug_handle = logging::init(verbosity);

    let node_entry = match topology.nodes.get(&args.node).cloned() {
        Some(entry) => entry,
        None => {
            eprintln!("dtsd: node {:?} is not present in the configuration", args.node);
            return ExitCode::from(1);
        }
    };

    let daemon = match Daemon::new(args.node.clone(), topology, debug_handle, verbosity) {
        Ok(daemon) => Arc::new(daemon),
        Err(err) => {
            eprintln!("dtsd: failed to start: {err}");
            return ExitCode::from(1);
        }
    };

    for queue_name in daemon.queue_names() {
        let daemon = Arc::clone(&daemon);
        std::thread::spawn(move || daemon.run_queue_loop(&queue_name));
    }

    tracing::info!(node = %node_entry.name, port = node_entry.port, "dtsd starting");
    if let Err(err) = daemon::server::serve(daemon, ("0.0.0.0", node_entry.port)) {
        eprintln!("dtsd: RPC listener failed: {err}");
        return ExitCode::from(2);
    }

    ExitCode::SUCCESS
}

fn load_topology(args: &Args) -> Result<Topology, config::ConfigError> {
    match &args.config {
        Some(path) => Topology::load(path),
        None => Topology::load_default(),
    }
}
