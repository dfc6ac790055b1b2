//! A blocking client for the command-port RPC channel (spec §6), used by
//! the transfer handshake coordinator (spec §4.4) to call a downstream
//! peer's methods.

use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;

use protocol::{Method, Outcome};

use crate::rpc::{decode_response, encode_request};

/// A connection to one peer's command port.
pub struct RpcClient {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl RpcClient {
    /// Connects to `host:port`.
    pub fn connect(host: &str, port: u16) -> io::Result<Self> {
        let stream = TcpStream::connect((host, port))?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self { stream, reader })
    }

    /// Issues one RPC call and waits for its response.
    pub fn call(&mut self, method: Method, args: &[String]) -> io::Result<Outcome<Vec<String>>> {
        self.stream
            .write_all(encode_request(method.as_str(), args).as_bytes())?;
        let mut line = String::new();
        self.reader.read_line(&mut line)?;
        Ok(decode_response(&line))
    }

    /// Issues a password-protected call, prepending `secret` as required
    /// by spec §6.
    pub fn call_with_password(
        &mut self,
        method: Method,
        secret: &str,
        args: &[String],
    ) -> io::Result<Outcome<Vec<String>>> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(secret.to_owned());
        full.extend_from_slice(args);
        self.call(method, &full)
    }
}
