//! Line-oriented parser for the configuration text format (spec §6).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::topology::{
    ChecksumPolicy, DeliveryPolicy, GlobalConfig, NodeEntry, QueueConfig, QueueType, Topology,
    TransferMode, TransportMethod,
};

/// Errors surfaced while loading or parsing a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither `DTS_CONFIG` nor `HOME` were set, so no default path exists.
    #[error("no configuration path: set DTS_CONFIG or HOME")]
    NoConfigPath,
    /// The configuration file could not be read.
    #[error("could not read configuration file: {0}")]
    Io(#[source] io::Error),
    /// A `dts` stanza was missing a required field.
    #[error("dts stanza for `{0}` is missing required field `{1}`")]
    MissingNodeField(String, &'static str),
    /// A `queue` stanza was missing a required field.
    #[error("queue stanza for `{0}` is missing required field `{1}`")]
    MissingQueueField(String, &'static str),
    /// A `queue` stanza named a `node` that has no matching `dts` stanza.
    #[error("queue `{queue}` references unknown node `{node}`")]
    UnknownNode {
        /// Offending queue name.
        queue: String,
        /// Node name that was not found.
        node: String,
    },
    /// A numeric field could not be parsed.
    #[error("invalid numeric value for `{field}`: {value:?}")]
    InvalidNumber {
        /// Field name.
        field: &'static str,
        /// Offending raw text.
        value: String,
    },
    /// A key/value line could not be split.
    #[error("malformed configuration line: {0:?}")]
    MalformedLine(String),
}

enum Stanza {
    Global,
    Node(PartialNode),
    Queue(PartialQueue),
}

#[derive(Default)]
struct PartialNode {
    name: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    contact: Option<u16>,
    root: Option<PathBuf>,
    lo_port: Option<u16>,
    hi_port: Option<u16>,
    network: Option<String>,
    copy_dir: Option<PathBuf>,
    logfile: Option<PathBuf>,
    dbfile: Option<PathBuf>,
}

#[derive(Default)]
struct PartialQueue {
    name: Option<String>,
    qtype: Option<QueueType>,
    node: Option<String>,
    src: Option<String>,
    dest: Option<String>,
    purge: bool,
    delivery_dir: Option<PathBuf>,
    delivery_cmd: Option<String>,
    checksum_policy: ChecksumPolicy,
    delivery_policy: DeliveryPolicy,
    deliver_as: Option<String>,
    method: TransportMethod,
    mode: TransferMode,
    nthreads: Option<u32>,
    port: Option<u16>,
    keepalive: bool,
    udt_rate: Option<u32>,
}

/// Parses a complete configuration text into a [`Topology`].
pub fn parse_str(text: &str) -> Result<Topology, ConfigError> {
    let mut topology = Topology::default();
    let mut stanza = Stanza::Global;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (keyword, rest) = split_first_token(line);
        match keyword.to_ascii_lowercase().as_str() {
            "dts" => {
                finish_stanza(stanza, &mut topology)?;
                stanza = Stanza::Node(PartialNode::default());
                if !rest.trim().is_empty() {
                    apply_node_field(stanza_as_node(&mut stanza), rest)?;
                }
            }
            "queue" => {
                finish_stanza(stanza, &mut topology)?;
                stanza = Stanza::Queue(PartialQueue::default());
                if !rest.trim().is_empty() {
                    apply_queue_field(stanza_as_queue(&mut stanza), rest)?;
                }
            }
            _ => match &mut stanza {
                Stanza::Global => apply_global_field(&mut topology.global, line)?,
                Stanza::Node(node) => apply_node_field(node, line)?,
                Stanza::Queue(queue) => apply_queue_field(queue, line)?,
            },
        }
    }
    finish_stanza(stanza, &mut topology)?;

    for queue in topology.queues.values() {
        if let Some(src) = &queue.src {
            if !topology.nodes.contains_key(src) {
                return Err(ConfigError::UnknownNode {
                    queue: queue.name.clone(),
                    node: src.clone(),
                });
            }
        }
        if let Some(dest) = &queue.dest {
            if !topology.nodes.contains_key(dest) {
                return Err(ConfigError::UnknownNode {
                    queue: queue.name.clone(),
                    node: dest.clone(),
                });
            }
        }
    }

    Ok(topology)
}

fn stanza_as_node(stanza: &mut Stanza) -> &mut PartialNode {
    match stanza {
        Stanza::Node(n) => n,
        _ => unreachable!("caller just constructed Stanza::Node"),
    }
}

fn stanza_as_queue(stanza: &mut Stanza) -> &mut PartialQueue {
    match stanza {
        Stanza::Queue(q) => q,
        _ => unreachable!("caller just constructed Stanza::Queue"),
    }
}

fn finish_stanza(stanza: Stanza, topology: &mut Topology) -> Result<(), ConfigError> {
    match stanza {
        Stanza::Global => Ok(()),
        Stanza::Node(node) => {
            let entry = build_node(node)?;
            topology.nodes.insert(entry.name.clone(), entry);
            Ok(())
        }
        Stanza::Queue(queue) => {
            let entry = build_queue(queue)?;
            topology
                .queues
                .insert((entry.node.clone(), entry.name.clone()), entry);
            Ok(())
        }
    }
}

fn build_node(partial: PartialNode) -> Result<NodeEntry, ConfigError> {
    let name = partial
        .name
        .ok_or(ConfigError::MissingNodeField(String::new(), "name"))?;
    macro_rules! require {
        ($field:expr, $label:literal) => {
            $field.ok_or_else(|| ConfigError::MissingNodeField(name.clone(), $label))?
        };
    }
    Ok(NodeEntry {
        host: require!(partial.host, "host"),
        port: require!(partial.port, "port"),
        contact: require!(partial.contact, "contact"),
        root: require!(partial.root, "root"),
        lo_port: require!(partial.lo_port, "loPort"),
        hi_port: require!(partial.hi_port, "hiPort"),
        network: partial.network,
        copy_dir: partial.copy_dir,
        logfile: partial.logfile,
        dbfile: partial.dbfile,
        name,
    })
}

fn build_queue(partial: PartialQueue) -> Result<QueueConfig, ConfigError> {
    let name = partial
        .name
        .ok_or(ConfigError::MissingQueueField(String::new(), "name"))?;
    macro_rules! require {
        ($field:expr, $label:literal) => {
            $field.ok_or_else(|| ConfigError::MissingQueueField(name.clone(), $label))?
        };
    }
    Ok(QueueConfig {
        qtype: require!(partial.qtype, "type"),
        node: require!(partial.node, "node"),
        src: partial.src,
        dest: partial.dest,
        purge: partial.purge,
        delivery_dir: partial.delivery_dir,
        delivery_cmd: partial.delivery_cmd,
        checksum_policy: partial.checksum_policy,
        delivery_policy: partial.delivery_policy,
        deliver_as: partial.deliver_as,
        method: partial.method,
        mode: partial.mode,
        nthreads: partial.nthreads.unwrap_or(1),
        port: partial.port,
        keepalive: partial.keepalive,
        udt_rate: partial.udt_rate,
        name,
    })
}

fn apply_global_field(global: &mut GlobalConfig, line: &str) -> Result<(), ConfigError> {
    let (key, value) = split_kv(line)?;
    match key.to_ascii_lowercase().as_str() {
        "debug" => global.debug = parse_bool(&value),
        "verbose" => global.verbose = parse_bool(&value),
        "monitor" => global.monitor = parse_bool(&value),
        "password" => global.password = Some(value),
        "ops_passwd" => global.ops_passwd = Some(value),
        "hb_time" => global.hb_time = Some(parse_num("hb_time", &value)?),
        _ => {}
    }
    Ok(())
}

fn apply_node_field(node: &mut PartialNode, line: &str) -> Result<(), ConfigError> {
    let (key, value) = split_kv(line)?;
    match key.to_ascii_lowercase().as_str() {
        "name" => node.name = Some(value),
        "host" => node.host = Some(value),
        "port" => node.port = Some(parse_num("port", &value)?),
        "contact" => node.contact = Some(parse_num("contact", &value)?),
        "root" => node.root = Some(PathBuf::from(value)),
        "loport" => node.lo_port = Some(parse_num("loPort", &value)?),
        "hiport" => node.hi_port = Some(parse_num("hiPort", &value)?),
        "network" => node.network = Some(value),
        "copydir" => node.copy_dir = Some(PathBuf::from(value)),
        "logfile" => node.logfile = Some(PathBuf::from(value)),
        "dbfile" => node.dbfile = Some(PathBuf::from(value)),
        _ => {}
    }
    Ok(())
}

fn apply_queue_field(queue: &mut PartialQueue, line: &str) -> Result<(), ConfigError> {
    let (key, value) = split_kv(line)?;
    match key.to_ascii_lowercase().as_str() {
        "name" => queue.name = Some(value),
        "type" => queue.qtype = Some(parse_queue_type(&value)),
        "node" => queue.node = Some(value),
        "src" => queue.src = Some(value),
        "dest" => queue.dest = Some(value),
        "purge" => queue.purge = parse_bool(&value),
        "deliverydir" => queue.delivery_dir = Some(PathBuf::from(value)),
        "deliverycmd" => queue.delivery_cmd = Some(value),
        "checksumpolicy" => {
            queue.checksum_policy = if value.eq_ignore_ascii_case("chunk") {
                ChecksumPolicy::Chunk
            } else {
                ChecksumPolicy::None
            };
        }
        "deliverypolicy" => {
            queue.delivery_policy = match value.to_ascii_lowercase().as_str() {
                "number" => DeliveryPolicy::Number,
                "original" => DeliveryPolicy::Original,
                _ => DeliveryPolicy::Replace,
            };
        }
        "deliveras" => queue.deliver_as = Some(value),
        "method" => {
            queue.method = if value.eq_ignore_ascii_case("udt") {
                TransportMethod::Udt
            } else {
                TransportMethod::Tcp
            };
        }
        "mode" => {
            queue.mode = if value.eq_ignore_ascii_case("pull") {
                TransferMode::Pull
            } else {
                TransferMode::Push
            };
        }
        "nthreads" => queue.nthreads = Some(parse_num("nthreads", &value)?),
        "port" => queue.port = Some(parse_num("port", &value)?),
        "keepalive" => queue.keepalive = parse_bool(&value),
        "udt_rate" => queue.udt_rate = Some(parse_num("udt_rate", &value)?),
        _ => {}
    }
    Ok(())
}

fn parse_queue_type(value: &str) -> QueueType {
    match value.to_ascii_lowercase().as_str() {
        "transfer" => QueueType::Transfer,
        "endpoint" => QueueType::Endpoint,
        _ => QueueType::Ingest,
    }
}

/// Splits `key = value` or `key value` into trimmed, unquoted parts.
fn split_kv(line: &str) -> Result<(String, String), ConfigError> {
    let (key, rest) = if let Some(idx) = line.find('=') {
        (line[..idx].trim(), line[idx + 1..].trim())
    } else {
        split_first_token(line)
    };
    if key.is_empty() {
        return Err(ConfigError::MalformedLine(line.to_string()));
    }
    Ok((key.to_string(), unquote(rest).to_string()))
}

fn split_first_token(line: &str) -> (&str, &str) {
    match line.find(char::is_whitespace) {
        Some(idx) => (&line[..idx], line[idx..].trim()),
        None => (line, ""),
    }
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'"' || bytes[0] == b'\'') && bytes[bytes.len() - 1] == bytes[0] {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.chars().next().map(|c| c.to_ascii_lowercase()),
        Some('1') | Some('y') | Some('t')
    )
}

fn parse_num<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}
