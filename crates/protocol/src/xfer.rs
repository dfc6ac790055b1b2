//! Positional argument tuples fixed by spec §6's "Wire framing for
//! `xfer*` calls" and the companion `sendFile`/`receiveFile` framing.

use crate::error::ProtocolError;

fn arg<'a>(args: &'a [String], index: usize) -> Result<&'a str, ProtocolError> {
    args.get(index)
        .map(String::as_str)
        .ok_or(ProtocolError::WrongArity {
            expected: index + 1,
            actual: args.len(),
        })
}

fn parse_arg<T: std::str::FromStr>(
    args: &[String],
    index: usize,
    name: &'static str,
) -> Result<T, ProtocolError> {
    arg(args, index)?
        .parse()
        .map_err(|_| ProtocolError::InvalidArgument {
            index,
            name,
            expected_type: std::any::type_name::<T>(),
        })
}

/// Arguments to `xferPushFile`/`xferPullFile` (spec §6): `(xferId,
/// method, fileName, fileSize, nthreads, udtRate, srcPort, srcHost,
/// destHost, srcCmdUrl, destCmdUrl, srcDir, destDir, srcFname, destFname)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XferArgs {
    /// Opaque session identifier shared by both sides of the hop.
    pub xfer_id: String,
    /// Transport method name (`"tcp"` or `"udt"`).
    pub method: String,
    /// Object filename.
    pub file_name: String,
    /// Declared object size in bytes.
    pub file_size: u64,
    /// Number of stripe worker threads.
    pub nthreads: u32,
    /// UDT congestion-controller rate hint in Mbps; `0` means unset.
    pub udt_rate: u32,
    /// Base transfer port.
    pub src_port: u16,
    /// Source node's command host.
    pub src_host: String,
    /// Destination node's command host.
    pub dest_host: String,
    /// Source node's command-URL.
    pub src_cmd_url: String,
    /// Destination node's command-URL.
    pub dest_cmd_url: String,
    /// Source-side directory.
    pub src_dir: String,
    /// Destination-side directory.
    pub dest_dir: String,
    /// Source-side filename.
    pub src_fname: String,
    /// Destination-side filename.
    pub dest_fname: String,
}

const XFER_ARGS_ARITY: usize = 15;

impl XferArgs {
    /// Encodes this tuple in the fixed positional order.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            self.xfer_id.clone(),
            self.method.clone(),
            self.file_name.clone(),
            self.file_size.to_string(),
            self.nthreads.to_string(),
            self.udt_rate.to_string(),
            self.src_port.to_string(),
            self.src_host.clone(),
            self.dest_host.clone(),
            self.src_cmd_url.clone(),
            self.dest_cmd_url.clone(),
            self.src_dir.clone(),
            self.dest_dir.clone(),
            self.src_fname.clone(),
            self.dest_fname.clone(),
        ]
    }

    /// Decodes this tuple from its fixed positional order.
    pub fn from_args(args: &[String]) -> Result<Self, ProtocolError> {
        if args.len() != XFER_ARGS_ARITY {
            return Err(ProtocolError::WrongArity {
                expected: XFER_ARGS_ARITY,
                actual: args.len(),
            });
        }
        Ok(Self {
            xfer_id: arg(args, 0)?.to_owned(),
            method: arg(args, 1)?.to_owned(),
            file_name: arg(args, 2)?.to_owned(),
            file_size: parse_arg(args, 3, "fileSize")?,
            nthreads: parse_arg(args, 4, "nthreads")?,
            udt_rate: parse_arg(args, 5, "udtRate")?,
            src_port: parse_arg(args, 6, "srcPort")?,
            src_host: arg(args, 7)?.to_owned(),
            dest_host: arg(args, 8)?.to_owned(),
            src_cmd_url: arg(args, 9)?.to_owned(),
            dest_cmd_url: arg(args, 10)?.to_owned(),
            src_dir: arg(args, 11)?.to_owned(),
            dest_dir: arg(args, 12)?.to_owned(),
            src_fname: arg(args, 13)?.to_owned(),
            dest_fname: arg(args, 14)?.to_owned(),
        })
    }
}

/// Arguments to `sendFile`/`receiveFile` (spec §6): `(xferId, method,
/// fileName, fileSize, nthreads, udtRate, srcPort, peerIP, dir)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendFileArgs {
    /// Opaque session identifier, shared with the peer's [`XferArgs`].
    pub xfer_id: String,
    /// Transport method name (`"tcp"` or `"udt"`).
    pub method: String,
    /// Object filename.
    pub file_name: String,
    /// Declared object size in bytes.
    pub file_size: u64,
    /// Number of stripe worker threads.
    pub nthreads: u32,
    /// UDT congestion-controller rate hint in Mbps; `0` means unset.
    pub udt_rate: u32,
    /// Base transfer port the peer is listening on (or will listen on).
    pub src_port: u16,
    /// IP address of the peer issuing this call.
    pub peer_ip: String,
    /// Local working directory for this side of the stripe transfer.
    pub dir: String,
}

const SEND_FILE_ARGS_ARITY: usize = 9;

impl SendFileArgs {
    /// Encodes this tuple in the fixed positional order.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            self.xfer_id.clone(),
            self.method.clone(),
            self.file_name.clone(),
            self.file_size.to_string(),
            self.nthreads.to_string(),
            self.udt_rate.to_string(),
            self.src_port.to_string(),
            self.peer_ip.clone(),
            self.dir.clone(),
        ]
    }

    /// Decodes this tuple from its fixed positional order.
    pub fn from_args(args: &[String]) -> Result<Self, ProtocolError> {
        if args.len() != SEND_FILE_ARGS_ARITY {
            return Err(ProtocolError::WrongArity {
                expected: SEND_FILE_ARGS_ARITY,
                actual: args.len(),
            });
        }
        Ok(Self {
            xfer_id: arg(args, 0)?.to_owned(),
            method: arg(args, 1)?.to_owned(),
            file_name: arg(args, 2)?.to_owned(),
            file_size: parse_arg(args, 3, "fileSize")?,
            nthreads: parse_arg(args, 4, "nthreads")?,
            udt_rate: parse_arg(args, 5, "udtRate")?,
            src_port: parse_arg(args, 6, "srcPort")?,
            peer_ip: arg(args, 7)?.to_owned(),
            dir: arg(args, 8)?.to_owned(),
        })
    }
}

/// The `"<sec> <usec> <status>"` result string returned by `xferPushFile`
/// /`xferPullFile` (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferResult {
    /// Whole-second component of elapsed transfer time.
    pub tsec: i64,
    /// Microsecond remainder of elapsed transfer time.
    pub tusec: i64,
    /// Whether the stripe session completed successfully.
    pub ok: bool,
}

impl TransferResult {
    /// Formats this result as the fixed `"<sec> <usec> <status>"` string.
    pub fn encode(&self) -> String {
        format!(
            "{} {} {}",
            self.tsec,
            self.tusec,
            if self.ok { "OK" } else { "ERR" }
        )
    }

    /// Parses the fixed `"<sec> <usec> <status>"` string.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let mut parts = text.split_whitespace();
        let invalid = |name| ProtocolError::InvalidArgument {
            index: 0,
            name,
            expected_type: "TransferResult field",
        };
        let tsec = parts.next().ok_or_else(|| invalid("tsec"))?;
        let tusec = parts.next().ok_or_else(|| invalid("tusec"))?;
        let status = parts.next().ok_or_else(|| invalid("status"))?;
        Ok(Self {
            tsec: tsec.parse().map_err(|_| invalid("tsec"))?,
            tusec: tusec.parse().map_err(|_| invalid("tusec"))?,
            ok: status.eq_ignore_ascii_case("OK"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_xfer_args() -> XferArgs {
        XferArgs {
            xfer_id: "xfer-1".to_owned(),
            method: "tcp".to_owned(),
            file_name: "object.dat".to_owned(),
            file_size: 5_242_880,
            nthreads: 4,
            udt_rate: 0,
            src_port: 41000,
            src_host: "nodeA".to_owned(),
            dest_host: "nodeB".to_owned(),
            src_cmd_url: "nodeA:9000".to_owned(),
            dest_cmd_url: "nodeB:9000".to_owned(),
            src_dir: "/spool/q1/0".to_owned(),
            dest_dir: "/spool/q1/7".to_owned(),
            src_fname: "object.dat".to_owned(),
            dest_fname: "object.dat".to_owned(),
        }
    }

    #[test]
    fn xfer_args_round_trip_through_positional_encoding() {
        let args = sample_xfer_args();
        assert_eq!(XferArgs::from_args(&args.to_args()).unwrap(), args);
    }

    #[test]
    fn xfer_args_rejects_wrong_arity() {
        let err = XferArgs::from_args(&["one".to_owned()]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::WrongArity {
                expected: XFER_ARGS_ARITY,
                actual: 1
            }
        );
    }

    #[test]
    fn send_file_args_round_trip_through_positional_encoding() {
        let args = SendFileArgs {
            xfer_id: "xfer-1".to_owned(),
            method: "tcp".to_owned(),
            file_name: "object.dat".to_owned(),
            file_size: 5_242_880,
            nthreads: 4,
            udt_rate: 0,
            src_port: 41000,
            peer_ip: "10.0.0.5".to_owned(),
            dir: "/spool/q1/7".to_owned(),
        };
        assert_eq!(SendFileArgs::from_args(&args.to_args()).unwrap(), args);
    }

    #[test]
    fn transfer_result_round_trips() {
        let result = TransferResult {
            tsec: 12,
            tusec: 345_000,
            ok: true,
        };
        assert_eq!(TransferResult::decode(&result.encode()).unwrap(), result);
    }

    #[test]
    fn transfer_result_decodes_err_status() {
        let result = TransferResult::decode("0 0 ERR").unwrap();
        assert!(!result.ok);
    }
}
