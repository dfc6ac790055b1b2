//! `dtsctl`: a thin, non-interactive client issuing single RPC calls
//! against a running `dtsd` (spec §6). Deliberately not the interactive
//! shell spec.md excludes — one command, one call, one exit code.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use daemon::RpcClient;
use protocol::{Method, Outcome};

#[derive(Debug, Parser)]
#[command(name = "dtsctl", about = "One-shot RPC client for a running dtsd")]
struct Args {
    /// Target daemon's command host.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Target daemon's command port.
    #[arg(long)]
    port: u16,

    /// Shared secret for password-protected calls.
    #[arg(long)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// `ping`: liveness probe.
    Ping,
    /// `listQueue`: list queues configured on the target node.
    ListQueue,
    /// `startQueue <name>`: resume a paused queue.
    StartQueue { name: String },
    /// `stopQueue <name>` (`pauseQueue`): suspend a queue after its current hop.
    StopQueue { name: String },
    /// `pokeQueue <name>`: force-skip the current slot.
    PokeQueue { name: String },
    /// `shutdownQueue <name>`: stop a queue's manager loop permanently.
    ShutdownQueue { name: String },
    /// `getQueueStat <name>`: the queue's aggregated throughput counters.
    GetQueueStat { name: String },
    /// `setDbg`: raise the daemon's log level to debug.
    SetDbg,
    /// `unsetDbg`: restore the daemon's configured log level.
    UnsetDbg,
}

impl Command {
    fn method(&self) -> Method {
        match self {
            Command::Ping => Method::Ping,
            Command::ListQueue => Method::ListQueue,
            Command::StartQueue { .. } => Method::StartQueue,
            Command::StopQueue { .. } => Method::StopQueue,
            Command::PokeQueue { .. } => Method::PokeQueue,
            Command::ShutdownQueue { .. } => Method::ShutdownQueue,
            Command::GetQueueStat { .. } => Method::GetQueueStat,
            Command::SetDbg => Method::SetDbg,
            Command::UnsetDbg => Method::UnsetDbg,
        }
    }

    fn args(&self) -> Vec<String> {
        match self {
            Command::StartQueue { name }
            | Command::StopQueue { name }
            | Command::PokeQueue { name }
            | Command::ShutdownQueue { name }
            | Command::GetQueueStat { name } => vec![name.clone()],
            _ => vec![],
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut client = match RpcClient::connect(&args.host, args.port) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("dtsctl: could not connect to {}:{}: {err}", args.host, args.port);
            return ExitCode::from(1);
        }
    };

    let method = args.command.method();
    let call_args = args.command.args();
    let outcome = if method.requires_password() {
        let secret = args.password.clone().unwrap_or_default();
        client.call_with_password(method, &secret, &call_args)
    } else {
        client.call(method, &call_args)
    };

    match outcome {
        Ok(Outcome::Ok(fields)) => {
            println!("{}", fields.join("\t"));
            ExitCode::SUCCESS
        }
        Ok(Outcome::Err(message)) => {
            eprintln!("dtsctl: {message}");
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("dtsctl: RPC call failed: {err}");
            ExitCode::from(1)
        }
    }
}
