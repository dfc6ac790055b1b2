//! The command-port RPC listener (spec §6): accepts one connection per
//! call, reads a single request line, dispatches through
//! [`Daemon::handle_call`], and writes one response line back.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;

use crate::daemon::Daemon;
use crate::rpc::{decode_request, encode_response};

/// Best-effort reverse lookup of a connecting peer, for diagnostic logging
/// only — never used for access control, and any failure is swallowed.
fn peer_hostname(addr: SocketAddr) -> Option<String> {
    dns_lookup::lookup_addr(&addr.ip()).ok()
}

/// Binds `bind_addr` and serves RPC connections until the process exits.
/// Each connection is handled on its own thread so a slow/stuck client
/// (or a long-running transfer handshake issued against this node) never
/// blocks other callers.
pub fn serve(daemon: Arc<Daemon>, bind_addr: (&str, u16)) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_addr)?;
    tracing::info!(node = daemon.node_name(), addr = ?bind_addr, "RPC listener started");
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!(error = %err, "failed to accept RPC connection");
                continue;
            }
        };
        let daemon = Arc::clone(&daemon);
        std::thread::spawn(move || handle_connection(daemon, stream));
    }
    Ok(())
}

fn handle_connection(daemon: Arc<Daemon>, stream: TcpStream) {
    let peer = stream.peer_addr().ok();
    tracing::debug!(?peer, hostname = ?peer.and_then(peer_hostname), "RPC connection accepted");
    let mut writer = match stream.try_clone() {
        Ok(s) => s,
        Err(err) => {
            tracing::warn!(error = %err, "failed to clone RPC connection");
            return;
        }
    };
    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(?peer, error = %err, "RPC connection read error");
                break;
            }
        }

        let Some((method, args)) = decode_request(&line) else {
            tracing::warn!(?peer, line = %line.trim_end(), "malformed RPC request line");
            break;
        };

        let outcome = daemon.handle_call(&method, args);
        if writer.write_all(encode_response(&outcome).as_bytes()).is_err() {
            break;
        }
    }
}
