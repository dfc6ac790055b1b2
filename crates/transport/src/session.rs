//! Per-session striped transfer engine (spec §4.3 steps 1-5).
//!
//! Byte flow is always source→dest, but which side plays TCP server for the
//! stripe sockets depends on the transfer mode (spec §4.3: "A push session
//! has the source acting as TCP server... a pull session is the reverse").
//! [`run_sender_session`]/[`run_receiver_session_listening`] bind and listen;
//! [`run_receiver_session`]/[`run_sender_session_connecting`] connect out.
//! Both sides spawn one worker thread per stripe and fail the whole session
//! if any single stripe fails (spec §4.3 "Failure semantics").

use std::fs::File;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::os::unix::fs::FileExt as _;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::barrier::ReadinessBarrier;
use crate::chunk::ChunkHeader;
use crate::error::TransportError;
use crate::stripe::StripePlan;
use crate::{ChecksumPolicy, MAX_CHUNK_RESENDS};

/// Per-session knobs shared by every stripe worker.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The stripe partition to transfer (spec §3 "Stripe").
    pub stripes: Vec<StripePlan>,
    /// Chunk size in bytes (spec §3 "Chunk"); see
    /// [`crate::DEFAULT_CHUNK_SIZE`].
    pub chunk_size: usize,
    /// Whether per-chunk checksums are verified and mismatches resent.
    pub checksum_policy: ChecksumPolicy,
    /// Released once every server-side stripe worker is listening; `None`
    /// when the caller does not need to coordinate a peer-connect RPC
    /// around readiness (e.g. in tests).
    pub barrier: Option<Arc<ReadinessBarrier>>,
}

/// Result of a completed (successful) session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionOutcome {
    /// Total bytes moved across all stripes.
    pub bytes_transferred: u64,
    /// Number of stripes that completed (equal to `stripes.len()` on
    /// success, since any failure fails the whole session).
    pub stripes_completed: u32,
}

/// Serializes disk touches across stripe worker threads (spec §4.3: "this
/// is essential on rotational media and deliberate"); network I/O across
/// stripes otherwise proceeds independently.
#[derive(Debug, Default)]
struct StripeIoLock(Mutex<()>);

impl StripeIoLock {
    fn with_lock<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.0.lock().unwrap();
        f()
    }
}

fn stripe_addr(base: SocketAddr, index: u32) -> SocketAddr {
    let mut addr = base;
    addr.set_port(base.port() + index as u16);
    addr
}

fn bind_stripe_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    use socket2::{Domain, Socket, Type};
    let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
    let socket = Socket::new(domain, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1)?;
    Ok(socket.into())
}

fn accept_and_tune(listener: &TcpListener) -> std::io::Result<TcpStream> {
    let (stream, _peer) = listener.accept()?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

fn connect_and_tune(addr: SocketAddr) -> std::io::Result<TcpStream> {
    let stream = TcpStream::connect(addr)?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Max connect attempts and pause between them, for the side that must
/// connect out to a peer whose listener may not have bound yet (pull
/// sessions: the destination only starts listening once its RPC handler
/// begins running, which races the source's first connect attempt).
/// Grounded on the original's `dts_openClientSocket` bounded retry loop.
const MAX_CONNECT_RETRIES: u32 = 25;
const CONNECT_RETRY_PAUSE: Duration = Duration::from_millis(200);

fn connect_and_tune_with_retry(addr: SocketAddr) -> std::io::Result<TcpStream> {
    let mut last_err = None;
    for attempt in 0..=MAX_CONNECT_RETRIES {
        match connect_and_tune(addr) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                last_err = Some(e);
                if attempt < MAX_CONNECT_RETRIES {
                    std::thread::sleep(CONNECT_RETRY_PAUSE);
                }
            }
        }
    }
    Err(last_err.unwrap())
}

fn resolve_one(host: &str, port: u16) -> std::io::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no address resolved"))
}

/// Runs the source/sender side of a session: binds one listener per
/// stripe, reads its byte range out of `file`, and streams it to whichever
/// peer connects.
///
/// `bind_addr`'s port is the base port; stripe `i` binds on
/// `bind_addr.port() + i`.
pub fn run_sender_session(
    file: &File,
    bind_addr: SocketAddr,
    config: &SessionConfig,
) -> Result<SessionOutcome, TransportError> {
    run_session(file, config, |stripe, io_lock| {
        let addr = stripe_addr(bind_addr, stripe.index);
        let listener = bind_stripe_listener(addr)?;
        if let Some(barrier) = &config.barrier {
            barrier.arrive();
        }
        let mut stream = accept_and_tune(&listener)?;
        send_stripe(file, stripe, config, io_lock, &mut stream)
    })
}

/// Runs the dest/receiver side of a session: connects to each of the
/// sender's listening stripes and writes the incoming bytes into `file`.
///
/// `peer_base_port` is the sender's base port; stripe `i` connects to
/// `peer_base_port + i`.
pub fn run_receiver_session(
    file: &File,
    peer_host: &str,
    peer_base_port: u16,
    config: &SessionConfig,
) -> Result<SessionOutcome, TransportError> {
    let file_size: u64 = config.stripes.iter().map(|s| s.len).sum();
    file.set_len(file_size)?;

    run_session(file, config, |stripe, io_lock| {
        let port = peer_base_port + stripe.index as u16;
        let addr = resolve_one(peer_host, port)?;
        let mut stream = connect_and_tune(addr)?;
        recv_stripe(file, stripe, config, io_lock, &mut stream)
    })
}

/// Runs the source/sender side of a pull session: connects out to each of
/// the destination's listening stripe sockets and reads its byte range out
/// of `file` (spec §4.3 "a pull session is the reverse").
///
/// `peer_base_port` is the destination's base port; stripe `i` connects to
/// `peer_base_port + i`.
pub fn run_sender_session_connecting(
    file: &File,
    peer_host: &str,
    peer_base_port: u16,
    config: &SessionConfig,
) -> Result<SessionOutcome, TransportError> {
    run_session(file, config, |stripe, io_lock| {
        let port = peer_base_port + stripe.index as u16;
        let addr = resolve_one(peer_host, port)?;
        let mut stream = connect_and_tune_with_retry(addr)?;
        send_stripe(file, stripe, config, io_lock, &mut stream)
    })
}

/// Runs the dest/receiver side of a pull session: binds one listener per
/// stripe and writes the incoming bytes into `file` (spec §4.3 "a pull
/// session is the reverse").
///
/// `bind_addr`'s port is the base port; stripe `i` binds on
/// `bind_addr.port() + i`.
pub fn run_receiver_session_listening(
    file: &File,
    bind_addr: SocketAddr,
    config: &SessionConfig,
) -> Result<SessionOutcome, TransportError> {
    let file_size: u64 = config.stripes.iter().map(|s| s.len).sum();
    file.set_len(file_size)?;

    run_session(file, config, |stripe, io_lock| {
        let addr = stripe_addr(bind_addr, stripe.index);
        let listener = bind_stripe_listener(addr)?;
        if let Some(barrier) = &config.barrier {
            barrier.arrive();
        }
        let mut stream = accept_and_tune(&listener)?;
        recv_stripe(file, stripe, config, io_lock, &mut stream)
    })
}

fn run_session(
    _file: &File,
    config: &SessionConfig,
    worker: impl Fn(&StripePlan, &StripeIoLock) -> Result<u64, TransportError> + Sync,
) -> Result<SessionOutcome, TransportError> {
    let io_lock = StripeIoLock::default();
    let total = AtomicU64::new(0);
    let failed = AtomicUsize::new(0);
    let n = config.stripes.len();

    std::thread::scope(|scope| {
        let handles: Vec<_> = config
            .stripes
            .iter()
            .map(|stripe| scope.spawn(|| worker(stripe, &io_lock)))
            .collect();

        for (stripe, handle) in config.stripes.iter().zip(handles) {
            match handle.join().expect("stripe worker thread panicked") {
                Ok(bytes) => {
                    total.fetch_add(bytes, Ordering::Relaxed);
                }
                Err(err) => {
                    tracing::warn!(stripe = stripe.index, error = %err, "stripe failed");
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    });

    let failed = failed.load(Ordering::Relaxed);
    if failed > 0 {
        return Err(TransportError::StripeFailed { failed, total: n });
    }
    Ok(SessionOutcome {
        bytes_transferred: total.load(Ordering::Relaxed),
        stripes_completed: n as u32,
    })
}

fn send_stripe(
    file: &File,
    stripe: &StripePlan,
    config: &SessionConfig,
    io_lock: &StripeIoLock,
    stream: &mut TcpStream,
) -> Result<u64, TransportError> {
    let mut offset = stripe.start;
    let mut remaining = stripe.len;
    let mut sent = 0u64;

    while remaining > 0 {
        let take = remaining.min(config.chunk_size as u64) as usize;
        let mut buf = vec![0u8; take];
        io_lock.with_lock(|| file.read_exact_at(&mut buf, offset))?;

        let sum32 = match config.checksum_policy {
            ChecksumPolicy::Chunk => checksums::additive::Sum32::of(&buf),
            ChecksumPolicy::None => 0,
        };
        let header = ChunkHeader {
            sum16: 0,
            sum32,
            chunk_size: take as i32,
            offset: offset as i64,
            maxbytes: stripe.len as i64,
        };

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            header.write_to(stream)?;
            stream.write_all(&buf)?;

            if config.checksum_policy == ChecksumPolicy::None {
                break;
            }
            let mut ack = [0u8; 1];
            stream.read_exact(&mut ack)?;
            if ack[0] == 1 {
                break;
            }
            if attempts >= MAX_CHUNK_RESENDS {
                return Err(TransportError::ChecksumExhausted {
                    stripe: stripe.index,
                    offset,
                    attempts,
                });
            }
        }

        offset += take as u64;
        remaining -= take as u64;
        sent += take as u64;
    }
    Ok(sent)
}

fn recv_stripe(
    file: &File,
    stripe: &StripePlan,
    config: &SessionConfig,
    io_lock: &StripeIoLock,
    stream: &mut TcpStream,
) -> Result<u64, TransportError> {
    let mut received = 0u64;

    while received < stripe.len {
        let header = ChunkHeader::read_from(stream)?;
        let chunk_len = header.chunk_size as usize;
        let mut buf = vec![0u8; chunk_len];
        stream.read_exact(&mut buf)?;

        if config.checksum_policy == ChecksumPolicy::Chunk {
            let actual = checksums::additive::Sum32::of(&buf);
            if actual != header.sum32 {
                stream.write_all(&[0u8])?;
                continue;
            }
            stream.write_all(&[1u8])?;
        }

        io_lock.with_lock(|| file.write_all_at(&buf, header.offset as u64))?;
        received += chunk_len as u64;
    }

    if received != stripe.len {
        return Err(TransportError::ShortTransfer {
            stripe: stripe.index,
            transferred: received,
            expected: stripe.len,
        });
    }
    Ok(received)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stripe::plan;
    use std::net::Ipv4Addr;

    fn free_port() -> u16 {
        TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    fn run_roundtrip(data: &[u8], n_stripes: u32, policy: ChecksumPolicy) {
        let base_port = free_port();
        let bind_addr = SocketAddr::from((Ipv4Addr::LOCALHOST, base_port));

        let src_dir = tempfile::tempdir().unwrap();
        let src_path = src_dir.path().join("src");
        std::fs::write(&src_path, data).unwrap();
        let src_file = File::open(&src_path).unwrap();

        let dest_dir = tempfile::tempdir().unwrap();
        let dest_path = dest_dir.path().join("dest");
        let dest_file = File::create(&dest_path).unwrap();

        let stripes = plan(data.len() as u64, n_stripes);
        let barrier = Arc::new(ReadinessBarrier::new(stripes.len()));

        let sender_config = SessionConfig {
            stripes: stripes.clone(),
            chunk_size: 4096,
            checksum_policy: policy,
            barrier: Some(Arc::clone(&barrier)),
        };
        let receiver_config = SessionConfig {
            stripes,
            chunk_size: 4096,
            checksum_policy: policy,
            barrier: None,
        };

        std::thread::scope(|scope| {
            let sender = scope.spawn(|| run_sender_session(&src_file, bind_addr, &sender_config));
            barrier.wait_all();
            let receiver = scope.spawn(|| {
                run_receiver_session(&dest_file, "127.0.0.1", base_port, &receiver_config)
            });

            let sender_outcome = sender.join().unwrap().unwrap();
            let receiver_outcome = receiver.join().unwrap().unwrap();
            assert_eq!(sender_outcome.bytes_transferred, data.len() as u64);
            assert_eq!(receiver_outcome.bytes_transferred, data.len() as u64);
        });

        let written = std::fs::read(&dest_path).unwrap();
        assert_eq!(written, data);
    }

    #[test]
    fn single_stripe_no_checksum() {
        run_roundtrip(&[1, 2, 3, 4, 5, 6, 7, 8], 1, ChecksumPolicy::None);
    }

    #[test]
    fn multi_stripe_with_checksum() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        run_roundtrip(&data, 5, ChecksumPolicy::Chunk);
    }

    #[test]
    fn empty_file_completes_trivially() {
        run_roundtrip(&[], 3, ChecksumPolicy::None);
    }
}
