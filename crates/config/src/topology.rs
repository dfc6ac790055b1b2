//! Parsed configuration data types (spec §3 "Queue", "Node registry"; §6).

use std::collections::HashMap;
use std::path::PathBuf;

/// A queue's position in the ingest → transfer → endpoint pipeline (spec
/// §2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    /// First hop: admits objects from outside the DTS mesh.
    Ingest,
    /// Middle hop: forwards from one queue to the next.
    Transfer,
    /// Terminal hop: delivers to the local filesystem and runs `deliveryCmd`.
    Endpoint,
}

/// Checksum policy for the striped transport engine (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChecksumPolicy {
    /// No per-chunk verification.
    #[default]
    None,
    /// Verify and resend each chunk (spec §4.3 steps 3-4).
    Chunk,
}

/// What the endpoint does when the delivery command leaves a file that
/// collides with an existing one (spec §4.6 "Delivery filename policy").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeliveryPolicy {
    /// Overwrite any existing file.
    #[default]
    Replace,
    /// Append a monotonic integer suffix on collision.
    Number,
    /// Refuse and log `ERR` on collision.
    Original,
}

/// Bulk-transport method (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportMethod {
    /// Striped TCP (the default).
    #[default]
    Tcp,
    /// Striped UDT.
    Udt,
}

/// One `dts` stanza: a peer process in the mesh (spec §3 "Node registry").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEntry {
    /// Unique node name.
    pub name: String,
    /// Command host.
    pub host: String,
    /// Command port.
    pub port: u16,
    /// Auxiliary contact port used for liveness checks.
    pub contact: u16,
    /// Working root directory for this node's spools.
    pub root: PathBuf,
    /// Low end of the reserved transfer-port range.
    pub lo_port: u16,
    /// High end of the reserved transfer-port range.
    pub hi_port: u16,
    /// Optional network/interface hint.
    pub network: Option<String>,
    /// Declared copy directory (used by the out-of-scope `dtscp` utility;
    /// carried through for configuration fidelity only).
    pub copy_dir: Option<PathBuf>,
    /// Optional per-node log file path.
    pub logfile: Option<PathBuf>,
    /// Optional per-node SQLite journal path (spec §9: write-only, optional).
    pub dbfile: Option<PathBuf>,
}

/// One `queue` stanza (spec §3 "Queue").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Unique queue name on this process.
    pub name: String,
    /// Queue type.
    pub qtype: QueueType,
    /// Node this queue lives on.
    pub node: String,
    /// Upstream node name (only meaningful to the manager that pulls).
    pub src: Option<String>,
    /// Downstream node name this queue forwards to.
    pub dest: Option<String>,
    /// Auto-purge flag.
    pub purge: bool,
    /// Delivery directory (endpoint queues).
    pub delivery_dir: Option<PathBuf>,
    /// Delivery command template (endpoint queues).
    pub delivery_cmd: Option<String>,
    /// Checksum policy for the transport engine.
    pub checksum_policy: ChecksumPolicy,
    /// Delivery collision policy.
    pub delivery_policy: DeliveryPolicy,
    /// Override delivery filename template (`$deliverAs`-style rewrite).
    pub deliver_as: Option<String>,
    /// Transport method.
    pub method: TransportMethod,
    /// Push or pull (spec §4.3 "Mode and direction").
    pub mode: TransferMode,
    /// Number of stripe threads, N.
    pub nthreads: u32,
    /// Fixed base port override, if configured (otherwise allocated from the
    /// node's `[lo_port..hi_port]` range, spec §4.4 step 3).
    pub port: Option<u16>,
    /// TCP keepalive toggle for data sockets.
    pub keepalive: bool,
    /// UDT congestion-controller rate hint in Mbps.
    pub udt_rate: Option<u32>,
}

/// Push/pull direction of the bulk transfer (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransferMode {
    /// Source acts as server for the data sockets.
    #[default]
    Push,
    /// Destination acts as server for the data sockets.
    Pull,
}

/// Global, non-stanza configuration keys (spec §6).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlobalConfig {
    /// Enable debug-level logging workspace-wide.
    pub debug: bool,
    /// Enable verbose logging workspace-wide.
    pub verbose: bool,
    /// Enable the (out-of-scope) monitoring daemon integration.
    pub monitor: bool,
    /// Shared secret required as the first argument of password-protected
    /// RPC calls (spec §6).
    pub password: Option<String>,
    /// Separate shared secret for operator-only calls.
    pub ops_passwd: Option<String>,
    /// Heartbeat interval in seconds.
    pub hb_time: Option<u64>,
}

/// The fully parsed configuration: globals plus every node and queue.
///
/// A single configuration file describes the whole mesh: the same logical
/// queue (e.g. `q1`) appears once per participating node, as an `ingest`
/// stanza on the node that admits it and an `endpoint` (or `transfer`)
/// stanza on the node that receives it. Queues are therefore keyed by
/// `(node, name)`, not by name alone (spec §3 "Queue": "name, unique per
/// process").
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Topology {
    /// Top-level settings.
    pub global: GlobalConfig,
    /// Every `dts` stanza, keyed by node name.
    pub nodes: HashMap<String, NodeEntry>,
    /// Every `queue` stanza, keyed by `(node, queue name)`.
    pub queues: HashMap<(String, String), QueueConfig>,
}

impl Topology {
    /// Returns the queues configured to run on `node_name`.
    pub fn queues_on(&self, node_name: &str) -> Vec<&QueueConfig> {
        self.queues
            .values()
            .filter(|q| q.node == node_name)
            .collect()
    }

    /// Looks up a single queue by node and name.
    pub fn queue(&self, node_name: &str, queue_name: &str) -> Option<&QueueConfig> {
        self.queues
            .get(&(node_name.to_string(), queue_name.to_string()))
    }
}
