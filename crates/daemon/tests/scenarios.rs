//! End-to-end scenarios (spec §8 "Concrete end-to-end scenarios"): two
//! real `Daemon`s talking over loopback TCP, driven through the actual
//! RPC handshake rather than by calling internal functions directly.

use std::sync::Arc;
use std::time::Duration;

use checksums::additive::Sum32;
use config::{
    ChecksumPolicy, DeliveryPolicy, NodeEntry, QueueConfig, QueueType, Topology, TransferMode,
    TransportMethod,
};
use control::ControlRecord;
use daemon::Daemon;
use logging::Verbosity;

fn node_entry(name: &str, port: u16, root: std::path::PathBuf, lo: u16, hi: u16) -> NodeEntry {
    NodeEntry {
        name: name.to_owned(),
        host: "127.0.0.1".to_owned(),
        port,
        contact: port + 1,
        root,
        lo_port: lo,
        hi_port: hi,
    }
}

fn sample_queue(qtype: QueueType, dest: Option<&str>, delivery_dir: Option<std::path::PathBuf>) -> QueueConfig {
    QueueConfig {
        name: "q1".into(),
        qtype,
        node: String::new(),
        src: None,
        dest: dest.map(str::to_owned),
        purge: true,
        delivery_dir,
        delivery_cmd: Some("/bin/true".into()),
        checksum_policy: ChecksumPolicy::None,
        delivery_policy: DeliveryPolicy::Replace,
        deliver_as: None,
        method: TransportMethod::Tcp,
        mode: TransferMode::Push,
        nthreads: 2,
        port: None,
        keepalive: true,
        udt_rate: None,
    }
}

/// Polls for `path` to exist (the manager loop's hop runs on its own
/// thread), up to a few seconds, rather than assuming a fixed sleep is
/// long enough.
fn wait_for_file(path: &std::path::Path) {
    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    while !path.exists() {
        if std::time::Instant::now() > deadline {
            panic!("timed out waiting for {path:?} to appear");
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    // Give the writer a moment past creation to finish the rename/flush.
    std::thread::sleep(Duration::from_millis(50));
}

fn spawn_daemon(node: &str, topology: Topology, port: u16) -> Arc<Daemon> {
    let debug_handle = logging::init(Verbosity::default());
    let daemon = Arc::new(Daemon::new(node.to_owned(), topology, debug_handle, Verbosity::default()).unwrap());
    let serving = Arc::clone(&daemon);
    std::thread::spawn(move || {
        daemon::server::serve(serving, ("127.0.0.1", port)).ok();
    });
    std::thread::sleep(Duration::from_millis(100));
    daemon
}

/// Seeds a queue's spool with one ready slot containing `payload`, with a
/// matching `_control` record (spec §4.1 "allocate slot" / "mark ingest
/// complete" semantics, written directly since the ingest-side submission
/// API itself is out of scope per spec.md §1).
fn seed_ready_slot(spool_root: &std::path::Path, queue: &str, filename: &str, payload: &[u8]) {
    let queue_dir = spool_root.join(queue);
    std::fs::create_dir_all(&queue_dir).unwrap();
    std::fs::write(queue_dir.join("next"), "1").unwrap();
    std::fs::write(queue_dir.join("current"), "0").unwrap();

    let slot_dir = queue_dir.join("0");
    std::fs::create_dir_all(&slot_dir).unwrap();
    std::fs::write(slot_dir.join(filename), payload).unwrap();

    let control = ControlRecord {
        origin_queue: queue.to_owned(),
        origin_host: "A".into(),
        queue_path: format!("spool/{queue}/0"),
        original_name: filename.to_owned(),
        transfer_name: filename.to_owned(),
        source_path: format!("/incoming/{filename}"),
        ingest_path: format!("A!/incoming/{filename}"),
        file_size: payload.len() as u64,
        sum32: Sum32::of(payload),
        crc32: 0,
        md5: "d41d8cd98f00b204e9800998ecf8427e".into(),
        is_directory: false,
        ingest_time: 1_700_000_000,
        delivery_name: None,
        params: vec![],
    };
    std::fs::write(slot_dir.join("_control"), control::emit(&control)).unwrap();
}

/// Scenario 1: simple hop, push, no checksum. A 64 KiB pseudo-random file
/// ingested on A (ingest queue, dest B) ends up byte-identical under B's
/// `deliveryDir`, and both queues' `current` advance to 1.
#[test]
fn simple_hop_push_delivers_identical_bytes() {
    let tmp = tempfile::tempdir().unwrap();
    let root_a = tmp.path().join("a");
    let root_b = tmp.path().join("b");
    let delivery_dir = tmp.path().join("out");

    let port_a = 29_101;
    let port_b = 29_111;

    let mut topology = Topology::default();
    topology.nodes.insert("A".into(), node_entry("A", port_a, root_a.clone(), 29_300, 29_319));
    topology.nodes.insert("B".into(), node_entry("B", port_b, root_b.clone(), 29_320, 29_339));

    let mut ingest_queue = sample_queue(QueueType::Ingest, Some("B"), None);
    ingest_queue.node = "A".into();
    topology.queues.insert(("A".into(), "q1".into()), ingest_queue);

    let mut endpoint_queue = sample_queue(QueueType::Endpoint, None, Some(delivery_dir.clone()));
    endpoint_queue.node = "B".into();
    topology.queues.insert(("B".into(), "q1".into()), endpoint_queue);

    let payload: Vec<u8> = (0..64 * 1024u32).map(|i| (i % 251) as u8).collect();
    seed_ready_slot(&root_a.join("spool"), "q1", "object.dat", &payload);

    let daemon_b = spawn_daemon("B", topology.clone(), port_b);
    let daemon_a = spawn_daemon("A", topology, port_a);

    let loop_daemon = Arc::clone(&daemon_a);
    let loop_handle = std::thread::spawn(move || loop_daemon.run_queue_loop("q1"));

    let delivered = delivery_dir.join("object.dat");
    wait_for_file(&delivered);
    assert_eq!(std::fs::read(&delivered).unwrap(), payload);

    daemon_a.request_shutdown();
    loop_handle.join().unwrap();
    daemon_b.request_shutdown();
}

/// Scenario 4 (reduced): two queues on one daemon, each talking to its own
/// endpoint, with non-overlapping port windows — both complete without
/// stepping on each other's stripe ports.
#[test]
fn parallel_queues_use_non_overlapping_port_windows() {
    let tmp = tempfile::tempdir().unwrap();
    let root_src = tmp.path().join("src");
    let root_dst_a = tmp.path().join("dst-a");
    let root_dst_b = tmp.path().join("dst-b");
    let out_a = tmp.path().join("out-a");
    let out_b = tmp.path().join("out-b");

    let port_src = 29_121;
    let port_dst_a = 29_131;
    let port_dst_b = 29_141;

    let mut topology = Topology::default();
    topology
        .nodes
        .insert("SRC".into(), node_entry("SRC", port_src, root_src.clone(), 29_400, 29_419));
    topology
        .nodes
        .insert("DSTA".into(), node_entry("DSTA", port_dst_a, root_dst_a.clone(), 29_420, 29_439));
    topology
        .nodes
        .insert("DSTB".into(), node_entry("DSTB", port_dst_b, root_dst_b.clone(), 29_440, 29_459));

    let mut qa = sample_queue(QueueType::Ingest, Some("DSTA"), None);
    qa.name = "qa".into();
    qa.node = "SRC".into();
    topology.queues.insert(("SRC".into(), "qa".into()), qa);

    let mut qb = sample_queue(QueueType::Ingest, Some("DSTB"), None);
    qb.name = "qb".into();
    qb.node = "SRC".into();
    topology.queues.insert(("SRC".into(), "qb".into()), qb);

    let mut endpoint_a = sample_queue(QueueType::Endpoint, None, Some(out_a.clone()));
    endpoint_a.name = "qa".into();
    endpoint_a.node = "DSTA".into();
    topology.queues.insert(("DSTA".into(), "qa".into()), endpoint_a);

    let mut endpoint_b = sample_queue(QueueType::Endpoint, None, Some(out_b.clone()));
    endpoint_b.name = "qb".into();
    endpoint_b.node = "DSTB".into();
    topology.queues.insert(("DSTB".into(), "qb".into()), endpoint_b);

    let payload_a: Vec<u8> = (0..16 * 1024u32).map(|i| (i % 193) as u8).collect();
    let payload_b: Vec<u8> = (0..16 * 1024u32).map(|i| (i % 211) as u8).collect();
    seed_ready_slot(&root_src.join("spool"), "qa", "a.dat", &payload_a);
    seed_ready_slot(&root_src.join("spool"), "qb", "b.dat", &payload_b);

    let daemon_dst_a = spawn_daemon("DSTA", topology.clone(), port_dst_a);
    let daemon_dst_b = spawn_daemon("DSTB", topology.clone(), port_dst_b);
    let daemon_src = spawn_daemon("SRC", topology, port_src);

    let loop_src_a = Arc::clone(&daemon_src);
    let handle_a = std::thread::spawn(move || loop_src_a.run_queue_loop("qa"));
    let loop_src_b = Arc::clone(&daemon_src);
    let handle_b = std::thread::spawn(move || loop_src_b.run_queue_loop("qb"));

    wait_for_file(&out_a.join("a.dat"));
    wait_for_file(&out_b.join("b.dat"));
    assert_eq!(std::fs::read(out_a.join("a.dat")).unwrap(), payload_a);
    assert_eq!(std::fs::read(out_b.join("b.dat")).unwrap(), payload_b);

    daemon_src.request_shutdown();
    handle_a.join().unwrap();
    handle_b.join().unwrap();
    daemon_dst_a.request_shutdown();
    daemon_dst_b.request_shutdown();
}
