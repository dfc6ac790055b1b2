//! The transfer handshake / control protocol (spec §4.4): the RPC call
//! sequence that negotiates a destination slot, commits the control file,
//! moves the object's bytes, and triggers delivery.
//!
//! Spec §4.4's own prose spells the control-commit call `setQueueControl`;
//! spec §6's RPC-surface table spells the same operation `queueSetControl`.
//! Both name one operation; this crate uses the §6 spelling on the wire
//! (`protocol::Method::QueueSetControl`) since §6 states method names are
//! "preserved for interoperability" and is the authoritative surface list.

use std::fs::File;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use config::NodeEntry;
use protocol::{Method, TransferResult, XferArgs};
use transport::{plan, ReadinessBarrier, SessionConfig};

use crate::error::HandshakeError;
use crate::manager::HopSlot;
use crate::ports::PortAllocator;
use crate::rpcclient::RpcClient;

pub(crate) fn map_checksum_policy(policy: config::ChecksumPolicy) -> transport::ChecksumPolicy {
    match policy {
        config::ChecksumPolicy::None => transport::ChecksumPolicy::None,
        config::ChecksumPolicy::Chunk => transport::ChecksumPolicy::Chunk,
    }
}

/// Below this declared size, striping isn't worth the thread/socket
/// overhead and the coordinator silently runs a single stripe (spec §8;
/// `examples/original_source/libdts/dtsPush.c`'s `MIN_MULTI_FSIZE` guard —
/// the header defining its exact value wasn't part of the recovered
/// sources, so this picks a conservative 10 MiB; see `DESIGN.md`).
const MIN_MULTI_FSIZE: u64 = 10 * 1024 * 1024;

/// Reads the `DTS_DELAY` diagnostic hook (SPEC_FULL.md §C): an optional
/// integer number of seconds to sleep immediately before dispatching the
/// admission call, purely for test harnesses exercising crash/timing
/// scenarios. Never applied on the byte-copy path itself.
fn apply_dts_delay_hook() {
    if let Ok(raw) = std::env::var("DTS_DELAY") {
        if let Ok(seconds) = raw.parse::<u64>() {
            if seconds > 0 {
                tracing::debug!(seconds, "DTS_DELAY hook sleeping before admission call");
                std::thread::sleep(Duration::from_secs(seconds));
            }
        }
    }
}

/// Verifies the downstream peer is reachable (spec §4.5 "verify downstream
/// reachable (ping; contact-port open)").
pub fn verify_downstream_reachable(downstream: &NodeEntry) -> Result<(), HandshakeError> {
    let mut client = RpcClient::connect(&downstream.host, downstream.port)
        .map_err(|e| HandshakeError::PeerUnreachable(e.to_string()))?;
    match client
        .call(Method::Ping, &[])
        .map_err(|e| HandshakeError::PeerUnreachable(e.to_string()))?
    {
        protocol::Outcome::Ok(_) => Ok(()),
        protocol::Outcome::Err(message) => Err(HandshakeError::PeerUnreachable(message)),
    }
}

/// Runs the full hop sequence of spec §4.4 steps 1-5 for one slot.
/// Returns `Ok(())` only when `endTransfer` reports success and the
/// caller may advance `current`.
pub fn run_hop(
    local: &NodeEntry,
    slot: &HopSlot<'_>,
    queue_name: &str,
    queue_nthreads: u32,
    checksum_policy: config::ChecksumPolicy,
    mode: config::TransferMode,
    downstream: &NodeEntry,
    port_allocator: &PortAllocator,
    password: Option<&str>,
) -> Result<(), HandshakeError> {
    apply_dts_delay_hook();
    verify_downstream_reachable(downstream)?;

    let mut client = RpcClient::connect(&downstream.host, downstream.port)
        .map_err(|e| HandshakeError::PeerUnreachable(e.to_string()))?;

    // Step 1: admission.
    let declared_size = slot.control.file_size;
    let accept_args = vec![queue_name.to_owned(), declared_size.to_string()];
    let dest_slot_path = call_password_protected(&mut client, Method::QueueAccept, password, &accept_args)?
        .into_iter()
        .next()
        .ok_or_else(|| HandshakeError::AdmissionRejected("empty queueAccept response".into()))?;

    // Step 2: control commit.
    let control_text = control::emit(slot.control);
    let control_args = vec![queue_name.to_owned(), dest_slot_path.clone(), control_text];
    call_password_protected(&mut client, Method::QueueSetControl, password, &control_args)?;

    // Step 3: data movement. Below MIN_MULTI_FSIZE the coordinator silently
    // runs a single stripe (spec §8), regardless of the configured thread
    // count.
    let nthreads = if declared_size < MIN_MULTI_FSIZE { 1 } else { queue_nthreads };
    let base_port = port_allocator
        .allocate(nthreads)
        .map_err(|e| HandshakeError::AdmissionRejected(e.to_string()))?;
    let transfer_result = run_stripe_transfer(
        slot,
        local,
        &mut client,
        queue_name,
        dest_slot_path.clone(),
        base_port,
        nthreads,
        checksum_policy,
        mode,
        downstream,
    )?;
    if !transfer_result.ok {
        return Err(HandshakeError::Transport(transport::TransportError::StripeFailed {
            failed: 1,
            total: 1,
        }));
    }

    // Step 4: finalize.
    let end_args = vec![queue_name.to_owned(), dest_slot_path];
    call_password_protected(&mut client, Method::EndTransfer, password, &end_args)?;

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_stripe_transfer(
    slot: &HopSlot<'_>,
    local: &NodeEntry,
    client: &mut RpcClient,
    _queue_name: &str,
    dest_slot_path: String,
    base_port: u16,
    nthreads: u32,
    checksum_policy: config::ChecksumPolicy,
    mode: config::TransferMode,
    downstream: &NodeEntry,
) -> Result<TransferResult, HandshakeError> {
    let file_path = slot.path.join(&slot.control.transfer_name);
    let file = File::open(&file_path)?;
    let stripes = plan(slot.control.file_size, nthreads);

    // Push: one `arrive()` per stripe worker, since each binds its own
    // listening socket inside `run_sender_session` (spec §4.3 "Readiness
    // barrier"). Pull: there is nothing local to wait for — the listener is
    // the remote peer, synchronized instead by `run_sender_session_connecting`'s
    // connect retry — so a single-arrival barrier just orders "spawned" before
    // the RPC call without forcing the coordinator to wait on the stripe count.
    let barrier_target = match mode {
        config::TransferMode::Push => stripes.len(),
        config::TransferMode::Pull => 1,
    };
    let barrier = Arc::new(ReadinessBarrier::new(barrier_target));

    let session_config = SessionConfig {
        stripes,
        chunk_size: transport::DEFAULT_CHUNK_SIZE,
        checksum_policy: map_checksum_policy(checksum_policy),
        barrier: Some(Arc::clone(&barrier)),
    };

    // Push: the source (this node) plays TCP server, binding locally and
    // waiting for the destination to connect once the xfer RPC call lands.
    // Pull: the destination plays server instead, so the source connects
    // out — with retry, since the destination only starts listening once
    // its own RPC handler begins running (spec §4.3 "a pull session is the
    // reverse").
    std::thread::scope(|scope| -> Result<TransferResult, HandshakeError> {
        let sender = scope.spawn(|| match mode {
            config::TransferMode::Push => {
                let bind_addr = SocketAddr::from(([0, 0, 0, 0], base_port));
                transport::run_sender_session(&file, bind_addr, &session_config)
            }
            config::TransferMode::Pull => {
                barrier.arrive();
                transport::run_sender_session_connecting(&file, &downstream.host, base_port, &session_config)
            }
        });

        barrier.wait_all();

        let method = match mode {
            config::TransferMode::Push => Method::XferPushFile,
            config::TransferMode::Pull => Method::XferPullFile,
        };
        let xfer_args = XferArgs {
            xfer_id: format!("{}-{dest_slot_path}", local.name),
            method: "tcp".to_owned(),
            file_name: slot.control.transfer_name.clone(),
            file_size: slot.control.file_size,
            nthreads,
            udt_rate: 0,
            src_port: base_port,
            src_host: local.host.clone(),
            dest_host: downstream.host.clone(),
            src_cmd_url: String::new(),
            dest_cmd_url: String::new(),
            src_dir: slot.path.display().to_string(),
            dest_dir: dest_slot_path,
            src_fname: slot.control.transfer_name.clone(),
            dest_fname: slot.control.effective_delivery_name().to_owned(),
        };
        let response = client
            .call(method, &xfer_args.to_args())
            .map_err(|e| HandshakeError::PeerUnreachable(e.to_string()))?;
        let result_text = match response {
            protocol::Outcome::Ok(mut fields) if !fields.is_empty() => fields.remove(0),
            protocol::Outcome::Ok(_) => {
                return Err(HandshakeError::AdmissionRejected("empty xfer response".into()))
            }
            protocol::Outcome::Err(message) => return Err(HandshakeError::AdmissionRejected(message)),
        };
        let peer_result = TransferResult::decode(&result_text)
            .map_err(|e| HandshakeError::AdmissionRejected(e.to_string()))?;

        // The local sender side raises its own error through `?` above, so
        // reaching here means it already completed successfully; overall
        // success is therefore exactly what the peer reports.
        sender
            .join()
            .expect("sender stripe thread panicked")
            .map_err(HandshakeError::Transport)?;

        Ok(TransferResult {
            tsec: peer_result.tsec,
            tusec: peer_result.tusec,
            ok: peer_result.ok,
        })
    })
}

fn call_password_protected(
    client: &mut RpcClient,
    method: Method,
    password: Option<&str>,
    args: &[String],
) -> Result<Vec<String>, HandshakeError> {
    let outcome = if method.requires_password() {
        let secret = password.unwrap_or_default();
        client
            .call_with_password(method, secret, args)
            .map_err(|e| HandshakeError::PeerUnreachable(e.to_string()))?
    } else {
        client
            .call(method, args)
            .map_err(|e| HandshakeError::PeerUnreachable(e.to_string()))?
    };
    match outcome {
        protocol::Outcome::Ok(fields) => Ok(fields),
        protocol::Outcome::Err(message) => Err(HandshakeError::AdmissionRejected(message)),
    }
}
