//! The top-level per-node daemon (spec §3 "Node", §4.5): owns every local
//! queue's [`QueueManager`], the RPC dispatch table, and the shared
//! debug/logging handle.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use config::{NodeEntry, QueueConfig, Topology};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use dashmap::DashMap;
use logging::{DebugHandle, Verbosity};
use protocol::{Method, Outcome};
use spool::SpoolQueue;

use crate::delivery;
use crate::diag;
use crate::handshake;
use crate::manager::{HopSlot, QueueManager, StepOutcome};
use crate::ports::PortAllocator;
use crate::stats::QueueStats;

/// A node's whole runtime: every local queue's manager plus the shared
/// infrastructure (port allocation, debug toggle, configuration) the RPC
/// dispatcher needs to answer the full §6 surface.
pub struct Daemon {
    node_name: String,
    topology: Topology,
    managers: DashMap<String, Arc<QueueManager>>,
    debug_handle: DebugHandle,
    baseline_verbosity: Verbosity,
    port_allocator: PortAllocator,
    /// Closed by [`Daemon::request_shutdown`] to wake every queue loop's
    /// backoff wait early; held so the channel stays open until then.
    shutdown_tx: Mutex<Option<Sender<()>>>,
    shutdown_rx: Receiver<()>,
}

/// Bootstrap failures: a referenced node is missing, or a queue's spool
/// directory could not be opened.
#[derive(Debug, thiserror::Error)]
pub enum DaemonBootError {
    /// `node_name` does not name a `dts` stanza in the topology.
    #[error("node {0:?} is not present in the configuration")]
    UnknownNode(String),
    /// Opening a queue's spool directory failed.
    #[error("failed to open spool for queue {queue:?}: {source}")]
    Spool {
        /// The queue that failed to open.
        queue: String,
        /// The underlying spool error.
        #[source]
        source: spool::SpoolError,
    },
}

impl Daemon {
    /// Builds a daemon for `node_name`, opening a [`SpoolQueue`] and
    /// [`QueueManager`] for every queue configured on this node.
    pub fn new(
        node_name: String,
        topology: Topology,
        debug_handle: DebugHandle,
        baseline_verbosity: Verbosity,
    ) -> Result<Self, DaemonBootError> {
        let node_entry = topology
            .nodes
            .get(&node_name)
            .cloned()
            .ok_or_else(|| DaemonBootError::UnknownNode(node_name.clone()))?;

        let managers = DashMap::new();
        for queue in topology.queues_on(&node_name) {
            let spool_dir = node_entry.root.join("spool").join(&queue.name);
            let spool = SpoolQueue::open(spool_dir, queue.purge).map_err(|e| DaemonBootError::Spool {
                queue: queue.name.clone(),
                source: e,
            })?;

            let report = spool.recover().map_err(|e| DaemonBootError::Spool {
                queue: queue.name.clone(),
                source: e,
            })?;
            if report.next_after != report.next_before {
                tracing::info!(
                    queue = %queue.name,
                    next_before = report.next_before,
                    next_after = report.next_after,
                    "recovery reconciled next counter"
                );
            }
            if !report.in_recovery.is_empty() {
                tracing::warn!(queue = %queue.name, slots = ?report.in_recovery, "slots interrupted mid-ingest, left for a retried ingest");
            }
            if queue.purge {
                for slot in &report.purgeable {
                    if let Err(e) = spool.purge_slot(*slot) {
                        tracing::warn!(queue = %queue.name, slot = *slot, error = %e, "failed to purge recovered slot");
                    }
                }
            }

            let manager = Arc::new(QueueManager::new(queue.clone(), spool));
            managers.insert(queue.name.clone(), manager);
        }

        let port_allocator = PortAllocator::new(node_entry.lo_port, node_entry.hi_port);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(0);

        Ok(Self {
            node_name,
            topology,
            managers,
            debug_handle,
            baseline_verbosity,
            port_allocator,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            shutdown_rx,
        })
    }

    /// This node's name.
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Queue names configured on this node.
    pub fn queue_names(&self) -> Vec<String> {
        self.managers.iter().map(|e| e.key().clone()).collect()
    }

    fn manager(&self, queue_name: &str) -> Option<Arc<QueueManager>> {
        self.managers.get(queue_name).map(|e| Arc::clone(e.value()))
    }

    fn downstream_of(&self, queue: &QueueConfig) -> Option<NodeEntry> {
        let dest_name = queue.dest.as_ref()?;
        self.topology.nodes.get(dest_name).cloned()
    }

    fn password(&self) -> Option<&str> {
        self.topology.global.password.as_deref()
    }

    /// Runs one queue's hop to its configured downstream (spec §4.4/§4.5),
    /// used as the `hop` callback plugged into [`QueueManager::step`].
    fn perform_hop(&self, manager: &QueueManager, slot: &HopSlot<'_>) -> bool {
        let Some(downstream) = self.downstream_of(&manager.config) else {
            tracing::warn!(queue = %manager.config.name, "hop attempted with no configured downstream");
            return false;
        };
        let Some(local) = self.topology.nodes.get(&self.node_name) else {
            tracing::error!(node = %self.node_name, "hop attempted with no registry entry for local node");
            return false;
        };
        let result = handshake::run_hop(
            local,
            slot,
            &manager.config.name,
            manager.config.nthreads,
            manager.config.checksum_policy,
            manager.config.mode,
            &downstream,
            &self.port_allocator,
            self.password(),
        );
        if let Err(ref err) = result {
            tracing::warn!(queue = %manager.config.name, slot = slot.slot, error = %err, "hop failed");
        }
        result.is_ok()
    }

    /// Drives one queue's manager loop until it reaches a terminal state
    /// (spec §4.5's main loop), waiting the constant backoff between
    /// empty/failed iterations. Intended to run on its own thread, one per
    /// local queue. The wait is cut short as soon as [`request_shutdown`]
    /// closes the daemon's shutdown channel.
    ///
    /// [`request_shutdown`]: Daemon::request_shutdown
    pub fn run_queue_loop(self: &Arc<Self>, queue_name: &str) {
        let Some(manager) = self.manager(queue_name) else {
            tracing::error!(queue = queue_name, "run_queue_loop: no such queue");
            return;
        };
        let daemon = Arc::clone(self);
        loop {
            let outcome = manager.step(&|mgr, slot| daemon.perform_hop(mgr, slot));
            match outcome {
                StepOutcome::Stopped => break,
                StepOutcome::Advanced | StepOutcome::Skipped => {}
                StepOutcome::NoWork | StepOutcome::SlotLocked | StepOutcome::HopFailed => {
                    if let Err(RecvTimeoutError::Disconnected) =
                        daemon.shutdown_rx.recv_timeout(crate::manager::RETRY_BACKOFF)
                    {
                        break;
                    }
                }
            }
        }
    }

    /// Wakes every queue loop's backoff wait and lets it observe the next
    /// [`StepOutcome::Stopped`] promptly rather than after a full
    /// [`crate::manager::RETRY_BACKOFF`]. Idempotent.
    pub fn request_shutdown(&self) {
        self.shutdown_tx.lock().unwrap().take();
    }

    /// Central RPC dispatcher (spec §6, §7 "Propagation"): parses the
    /// method name, enforces the password requirement, and dispatches to
    /// the matching handler, converting every error into an
    /// [`Outcome::Err`] rather than letting it escape.
    pub fn handle_call(&self, method_name: &str, args: Vec<String>) -> Outcome<Vec<String>> {
        let method = match Method::from_str(method_name) {
            Ok(method) => method,
            Err(err) => return Outcome::Err(err.to_string()),
        };

        let args = if method.requires_password() {
            match self.strip_password(&args) {
                Ok(rest) => rest,
                Err(message) => return Outcome::Err(message),
            }
        } else {
            args
        };

        self.dispatch(method, args)
    }

    fn strip_password(&self, args: &[String]) -> Result<Vec<String>, String> {
        let Some(expected) = self.password() else {
            return Ok(args.to_vec());
        };
        match args.split_first() {
            Some((supplied, rest)) if supplied == expected => Ok(rest.to_vec()),
            _ => Err("password mismatch".to_owned()),
        }
    }

    fn dispatch(&self, method: Method, args: Vec<String>) -> Outcome<Vec<String>> {
        let ok = |fields: Vec<String>| Outcome::Ok(fields);
        let ok_one = |field: String| Outcome::Ok(vec![field]);
        let err = |e: String| Outcome::Err(e);

        match method {
            Method::Ping => ok_one(diag::ping().to_owned()),
            Method::PingStr => match args.first() {
                Some(text) => ok_one(diag::pingstr(text)),
                None => err("pingstr requires one argument".into()),
            },
            Method::PingArray => ok(diag::pingarray(&args)),
            Method::PingSleep => match args.first().and_then(|s| s.parse::<u64>().ok()) {
                Some(seconds) => ok_one(diag::pingsleep(seconds).to_owned()),
                None => err("pingsleep requires an integer seconds argument".into()),
            },
            Method::RemotePing => match args.first() {
                Some(name) => match self.topology.nodes.get(name) {
                    Some(peer) => match handshake::verify_downstream_reachable(peer) {
                        Ok(()) => ok_one("pong".into()),
                        Err(e) => err(e.to_string()),
                    },
                    None => err(format!("unknown node: {name}")),
                },
                None => err("remotePing requires a node name".into()),
            },
            Method::SetDbg => match diag::set_dbg(&self.debug_handle) {
                Ok(()) => ok(vec![]),
                Err(e) => err(e),
            },
            Method::UnsetDbg => match diag::unset_dbg(&self.debug_handle, self.baseline_verbosity) {
                Ok(()) => ok(vec![]),
                Err(e) => err(e),
            },
            Method::NodeStat => ok_one(format!("{} online", self.node_name)),
            Method::Shutdown => {
                self.request_shutdown();
                ok(vec![])
            }
            Method::Init | Method::Abort | Method::Cfg => ok(vec![]),
            Method::TestFault => err("injected test fault".into()),

            Method::StartQueue => self.with_manager(&args, |m| {
                m.start();
                Ok(vec![])
            }),
            Method::StopQueue | Method::PauseQueue => self.with_manager(&args, |m| {
                m.pause();
                Ok(vec![])
            }),
            Method::PokeQueue => self.with_manager(&args, |m| {
                m.poke().map(|c| vec![c.to_string()]).map_err(|e| e.to_string())
            }),
            Method::ShutdownQueue => self.with_manager(&args, |m| {
                m.shutdown();
                Ok(vec![])
            }),
            Method::RestartQueue => self.with_manager(&args, |m| {
                m.respawn();
                Ok(vec![])
            }),
            Method::GetQueueStat => self.with_manager(&args, |m| Ok(vec![m.stats.summary_line()])),
            Method::SetQueueStat => err("setQueueStat is not externally settable".into()),
            Method::GetQueueCount => self.with_manager(&args, |m| {
                m.spool
                    .current()
                    .map(|c| vec![c.to_string()])
                    .map_err(|e| e.to_string())
            }),
            Method::SetQueueCount => err("setQueueCount is not externally settable".into()),
            Method::GetQueueDir => self.with_manager(&args, |m| Ok(vec![m.spool.root().display().to_string()])),
            Method::SetQueueDir => err("setQueueDir is not externally settable".into()),
            Method::GetQueueCmd => self.with_manager(&args, |m| {
                Ok(vec![m.config.delivery_cmd.clone().unwrap_or_default()])
            }),
            Method::SetQueueCmd => err("setQueueCmd is not externally settable".into()),
            Method::PrintQueueCfg => self.with_manager(&args, |m| Ok(vec![format!("{:?}", m.config)])),
            Method::ListQueue => ok(self.queue_names()),
            Method::QueueDest => self.with_manager(&args, |m| Ok(vec![m.config.dest.clone().unwrap_or_default()])),
            Method::QueueSrc => self.with_manager(&args, |m| Ok(vec![m.config.src.clone().unwrap_or_default()])),
            Method::QueueValid => ok_one(self.managers.contains_key(args.first().map(String::as_str).unwrap_or_default()).to_string()),

            Method::QueueAccept => self.handle_queue_accept(&args),
            Method::QueueSetControl => self.handle_queue_set_control(&args),
            Method::QueueComplete | Method::QueueRelease | Method::UpdateStats => ok(vec![]),

            Method::XferPushFile => self.handle_xfer_receive(&args, config::TransferMode::Push),
            Method::XferPullFile => self.handle_xfer_receive(&args, config::TransferMode::Pull),
            Method::InitTransfer => ok(vec![]),
            Method::EndTransfer => self.handle_end_transfer(&args),
            Method::SendFile | Method::ReceiveFile | Method::CancelTransfer => {
                err(format!("{} is not implemented on the RPC surface directly; data movement rides xferPushFile/xferPullFile", method.as_str()))
            }

            Method::Access => self.with_path(&args, |p| Ok(vec![diag::access(p).to_string()])),
            Method::Cat => self.with_path(&args, |p| diag::cat(p).map(|s| vec![s])),
            Method::Checksum => self.with_path(&args, |p| diag::checksum(p).map(|c| vec![c.to_string()])),
            Method::Chmod => match (args.first(), args.get(1)) {
                (Some(path), Some(mode)) => match diag::chmod(std::path::Path::new(path), mode) {
                    Ok(()) => ok(vec![]),
                    Err(e) => err(e),
                },
                _ => err("chmod requires a path and an octal mode".into()),
            },
            Method::Copy => match (args.first(), args.get(1)) {
                (Some(src), Some(dest)) => diag::copy(std::path::Path::new(src), std::path::Path::new(dest))
                    .map(|n| ok(vec![n.to_string()]))
                    .unwrap_or_else(|e| err(e)),
                _ => err("copy requires a source and destination".into()),
            },
            Method::Cwd => diag::cwd().map(|p| ok_one(p.display().to_string())).unwrap_or_else(err),
            Method::Del => self.with_path(&args, |p| diag::del(p).map(|_| vec![])),
            Method::Dir => self.with_path(&args, diag::dir),
            Method::Ddir => self.with_path(&args, diag::ddir),
            Method::IsDir => self.with_path(&args, |p| Ok(vec![diag::is_dir(p).to_string()])),
            Method::DiskFree => self.with_path(&args, |p| diag::disk_free(p).map(|n| vec![n.to_string()])),
            Method::DiskUsed => self.with_path(&args, |p| diag::disk_used(p).map(|n| vec![n.to_string()])),
            Method::Echo => match args.first() {
                Some(text) => ok_one(diag::echo(text)),
                None => err("echo requires an argument".into()),
            },
            Method::Fsize => self.with_path(&args, |p| diag::fsize(p).map(|n| vec![n.to_string()])),
            Method::Fmode => self.with_path(&args, |p| diag::fmode(p).map(|s| vec![s])),
            Method::Ftime => self.with_path(&args, |p| diag::ftime(p).map(|n| vec![n.to_string()])),
            Method::Mkdir => self.with_path(&args, |p| diag::mkdir(p).map(|_| vec![])),
            Method::Rename => match (args.first(), args.get(1)) {
                (Some(src), Some(dest)) => diag::rename(std::path::Path::new(src), std::path::Path::new(dest))
                    .map(|_| ok(vec![]))
                    .unwrap_or_else(err),
                _ => err("rename requires a source and destination".into()),
            },
            Method::SetRoot => ok(vec![]),
            Method::Stat => self.with_path(&args, |p| diag::stat(p).map(|s| vec![s])),
            Method::StatVal => match (args.first(), args.get(1)) {
                (Some(path), Some(field)) => diag::stat_val(std::path::Path::new(path), field)
                    .map(|v| ok(vec![v]))
                    .unwrap_or_else(err),
                _ => err("statVal requires a path and a field name".into()),
            },
            Method::Touch => self.with_path(&args, |p| diag::touch(p).map(|_| vec![])),
            Method::ReadFile => match (args.first(), args.get(1), args.get(2)) {
                (Some(path), Some(offset), Some(len)) => {
                    match (offset.parse::<u64>(), len.parse::<u64>()) {
                        (Ok(offset), Ok(len)) => {
                            diag::read_file(std::path::Path::new(path), offset, len)
                                .map(|s| ok(vec![s]))
                                .unwrap_or_else(err)
                        }
                        _ => err("read requires numeric offset and length".into()),
                    }
                }
                _ => err("read requires path, offset, and length".into()),
            },
            Method::Prealloc => match (args.first(), args.get(1).and_then(|s| s.parse::<u64>().ok())) {
                (Some(path), Some(size)) => diag::prealloc(std::path::Path::new(path), size)
                    .map(|_| ok(vec![]))
                    .unwrap_or_else(err),
                _ => err("prealloc requires a path and a size".into()),
            },
        }
    }

    fn with_manager(
        &self,
        args: &[String],
        f: impl FnOnce(&QueueManager) -> Result<Vec<String>, String>,
    ) -> Outcome<Vec<String>> {
        let Some(name) = args.first() else {
            return Outcome::Err("missing queue name argument".into());
        };
        match self.manager(name) {
            Some(manager) => Outcome::from_result(f(&manager)),
            None => Outcome::Err(format!("unknown queue: {name}")),
        }
    }

    fn with_path(
        &self,
        args: &[String],
        f: impl FnOnce(&std::path::Path) -> Result<Vec<String>, String>,
    ) -> Outcome<Vec<String>> {
        match args.first() {
            Some(path) => Outcome::from_result(f(std::path::Path::new(path))),
            None => Outcome::Err("missing path argument".into()),
        }
    }

    fn handle_queue_accept(&self, args: &[String]) -> Outcome<Vec<String>> {
        let (Some(queue_name), Some(size_str)) = (args.first(), args.get(1)) else {
            return Outcome::Err("queueAccept requires a queue name and declared size".into());
        };
        let Some(manager) = self.manager(queue_name) else {
            return Outcome::Err(format!("unknown queue: {queue_name}"));
        };
        let Ok(declared_size) = size_str.parse::<u64>() else {
            return Outcome::Err("declared size must be numeric".into());
        };
        match manager.spool.allocate_slot(declared_size) {
            Ok(handle) => Outcome::Ok(vec![handle.path.display().to_string()]),
            Err(e) => Outcome::Err(e.to_string()),
        }
    }

    fn handle_queue_set_control(&self, args: &[String]) -> Outcome<Vec<String>> {
        let (Some(queue_name), Some(slot_path), Some(control_text)) =
            (args.first(), args.get(1), args.get(2))
        else {
            return Outcome::Err("queueSetControl requires queue, slot path, and control text".into());
        };
        if self.manager(queue_name).is_none() {
            return Outcome::Err(format!("unknown queue: {queue_name}"));
        }
        match control::parse(control_text) {
            Ok(control) => {
                let control_path = std::path::Path::new(slot_path).join("_control");
                match std::fs::write(&control_path, control::emit(&control)) {
                    Ok(()) => Outcome::Ok(vec![]),
                    Err(e) => Outcome::Err(e.to_string()),
                }
            }
            Err(e) => Outcome::Err(e.to_string()),
        }
    }

    fn handle_xfer_receive(&self, args: &[String], mode: config::TransferMode) -> Outcome<Vec<String>> {
        let xfer_args = match protocol::XferArgs::from_args(args) {
            Ok(parsed) => parsed,
            Err(e) => return Outcome::Err(e.to_string()),
        };
        let dest_dir = std::path::PathBuf::from(&xfer_args.dest_dir);
        let file_path = dest_dir.join(&xfer_args.dest_fname);
        let file = match std::fs::OpenOptions::new().write(true).create(true).open(&file_path) {
            Ok(f) => f,
            Err(e) => return Outcome::Err(e.to_string()),
        };

        let checksum_policy = match queue_name_from_slot_path(&xfer_args.dest_dir).and_then(|name| self.manager(name)) {
            Some(manager) => handshake::map_checksum_policy(manager.config.checksum_policy),
            None => {
                tracing::warn!(dest_dir = %xfer_args.dest_dir, "could not resolve queue for inbound stripe session, defaulting to no checksum");
                transport::ChecksumPolicy::None
            }
        };

        let stripes = transport::plan(xfer_args.file_size, xfer_args.nthreads);
        let session_config = transport::SessionConfig {
            stripes,
            chunk_size: transport::DEFAULT_CHUNK_SIZE,
            checksum_policy,
            barrier: None,
        };

        let started = std::time::Instant::now();
        // Push: the peer is already listening (its RPC call only lands once
        // its own stripe listeners are up), so this side connects out. Pull:
        // this side is the one playing TCP server (spec §4.3 "a pull session
        // is the reverse").
        let result = match mode {
            config::TransferMode::Push => transport::run_receiver_session(
                &file,
                &xfer_args.src_host,
                xfer_args.src_port,
                &session_config,
            ),
            config::TransferMode::Pull => {
                let bind_addr = std::net::SocketAddr::from(([0, 0, 0, 0], xfer_args.src_port));
                transport::run_receiver_session_listening(&file, bind_addr, &session_config)
            }
        };
        let elapsed = started.elapsed();

        let transfer_result = protocol::TransferResult {
            tsec: elapsed.as_secs() as i64,
            tusec: elapsed.subsec_micros() as i64,
            ok: result.is_ok(),
        };
        if let Err(ref e) = result {
            tracing::warn!(error = %e, "inbound stripe session failed");
        }
        Outcome::Ok(vec![transfer_result.encode()])
    }

    fn handle_end_transfer(&self, args: &[String]) -> Outcome<Vec<String>> {
        let (Some(queue_name), Some(slot_path_str)) = (args.first(), args.get(1)) else {
            return Outcome::Err("endTransfer requires queue and slot path".into());
        };
        let Some(manager) = self.manager(queue_name) else {
            return Outcome::Err(format!("unknown queue: {queue_name}"));
        };
        let slot_path = std::path::PathBuf::from(slot_path_str);
        let control_path = slot_path.join("_control");
        let control_text = match std::fs::read_to_string(&control_path) {
            Ok(text) => text,
            Err(e) => return Outcome::Err(e.to_string()),
        };
        let mut control = match control::parse(&control_text) {
            Ok(c) => c,
            Err(e) => return Outcome::Err(e.to_string()),
        };

        if manager.config.qtype == config::QueueType::Endpoint {
            let _ = delivery::absorb_par_file(&slot_path, queue_name, &mut control);
            let cmd = manager.config.delivery_cmd.as_deref().unwrap_or("true");
            let expanded = delivery::expand_macros(cmd, &control, &manager.config);
            match delivery::run_delivery_command(&expanded, &slot_path) {
                Ok(delivery::DeliveryOutcome::Success | delivery::DeliveryOutcome::Minor) => {
                    let delivered_source = slot_path.join(&control.transfer_name);
                    if let Err(e) = delivery::place_delivered_file(&delivered_source, &manager.config, &control) {
                        manager.stats.record_failure();
                        return Outcome::Err(e.to_string());
                    }
                    manager.stats.record_success(&control.original_name, control.file_size);
                }
                Ok(delivery::DeliveryOutcome::FatalForObject) => {
                    manager.stats.record_failure();
                    return Outcome::Err("delivery command reported fatal-for-object".into());
                }
                Ok(delivery::DeliveryOutcome::FatalForQueue) => {
                    manager.stats.record_failure();
                    manager.pause();
                    return Outcome::Err("delivery command reported fatal-for-queue; queue paused".into());
                }
                Ok(delivery::DeliveryOutcome::Unknown(code)) => {
                    manager.stats.record_failure();
                    return Outcome::Err(format!("delivery command exited with unknown status {code}"));
                }
                Err(e) => {
                    manager.stats.record_failure();
                    return Outcome::Err(e.to_string());
                }
            }
        }

        Outcome::Ok(vec![])
    }
}

/// Recovers the queue a slot belongs to from its spool path
/// (`.../spool/<queue>/<slot>`), the same way the original derives a queue
/// from a transfer directory rather than carrying it on the wire
/// (`dtsXfer.c`'s `dts_queueFromPath`). `xferPushFile`/`xferPullFile`'s
/// fixed-arity args have no queue-name field, so this is how the receiving
/// side finds the queue's configured checksum policy.
fn queue_name_from_slot_path(slot_path: &str) -> Option<&str> {
    std::path::Path::new(slot_path).parent()?.file_name()?.to_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{ChecksumPolicy, DeliveryPolicy, QueueType, TransferMode, TransportMethod};

    fn sample_topology() -> Topology {
        let mut topology = Topology::default();
        topology.nodes.insert(
            "A".into(),
            NodeEntry {
                name: "A".into(),
                host: "localhost".into(),
                port: 9000,
                contact: 9001,
                root: std::env::temp_dir().join(format!("dts-daemon-test-{}", std::process::id())),
                lo_port: 41000,
                hi_port: 41099,
            },
        );
        topology.queues.insert(
            ("A".into(), "q1".into()),
            QueueConfig {
                name: "q1".into(),
                qtype: QueueType::Endpoint,
                node: "A".into(),
                src: None,
                dest: None,
                purge: false,
                delivery_dir: None,
                delivery_cmd: None,
                checksum_policy: ChecksumPolicy::None,
                delivery_policy: DeliveryPolicy::Replace,
                deliver_as: None,
                method: TransportMethod::Tcp,
                mode: TransferMode::Push,
                nthreads: 2,
                port: None,
                keepalive: true,
                udt_rate: None,
            },
        );
        topology
    }

    #[test]
    fn ping_requires_no_password_even_when_one_is_configured() {
        let mut topology = sample_topology();
        topology.global.password = Some("secret".into());
        let debug_handle = logging::init(Verbosity::default());
        let daemon = Daemon::new("A".into(), topology, debug_handle, Verbosity::default()).unwrap();
        assert_eq!(
            daemon.handle_call("ping", vec![]),
            Outcome::Ok(vec!["pong".to_owned()])
        );
    }

    #[test]
    fn password_protected_call_rejects_wrong_secret() {
        let mut topology = sample_topology();
        topology.global.password = Some("secret".into());
        let debug_handle = logging::init(Verbosity::default());
        let daemon = Daemon::new("A".into(), topology, debug_handle, Verbosity::default()).unwrap();
        let outcome = daemon.handle_call("startQueue", vec!["wrong".into(), "q1".into()]);
        assert!(matches!(outcome, Outcome::Err(_)));
    }

    #[test]
    fn list_queue_reports_configured_queues() {
        let topology = sample_topology();
        let debug_handle = logging::init(Verbosity::default());
        let daemon = Daemon::new("A".into(), topology, debug_handle, Verbosity::default()).unwrap();
        assert_eq!(daemon.handle_call("listQueue", vec![]), Outcome::Ok(vec!["q1".to_owned()]));
    }

    #[test]
    fn request_shutdown_wakes_the_queue_loop_promptly() {
        let topology = sample_topology();
        let debug_handle = logging::init(Verbosity::default());
        let daemon = Arc::new(Daemon::new("A".into(), topology, debug_handle, Verbosity::default()).unwrap());
        daemon.request_shutdown();

        let loop_daemon = Arc::clone(&daemon);
        let start = std::time::Instant::now();
        let handle = std::thread::spawn(move || loop_daemon.run_queue_loop("q1"));
        handle.join().unwrap();

        assert!(start.elapsed() < crate::manager::RETRY_BACKOFF);
    }
}
