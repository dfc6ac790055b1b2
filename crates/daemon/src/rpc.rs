//! The line-oriented wire codec shared by [`crate::rpcclient::RpcClient`]
//! and [`crate::server`]'s listener: one request or response per line,
//! fields tab-separated. Spec §6 fixes method names and fixed-arity
//! argument tuples for the handshake calls but leaves the actual byte
//! framing of the command channel unspecified (the reference used a
//! bespoke binary RPC library, out of scope per spec.md §1); this is the
//! Rust-native choice for that unspecified channel.

use protocol::Outcome;

const FIELD_SEP: char = '\t';

/// Encodes a request line: `method\targ1\targ2…\n`.
pub fn encode_request(method: &str, args: &[String]) -> String {
    let mut line = method.to_owned();
    for arg in args {
        line.push(FIELD_SEP);
        line.push_str(arg);
    }
    line.push('\n');
    line
}

/// Decodes a request line into `(method, args)`.
pub fn decode_request(line: &str) -> Option<(String, Vec<String>)> {
    let mut fields = line.trim_end_matches(['\n', '\r']).split(FIELD_SEP);
    let method = fields.next()?.to_owned();
    let args = fields.map(str::to_owned).collect();
    Some((method, args))
}

/// Encodes a response line: `OK\tfield1\tfield2…\n` or `ERR\tmessage\n`.
pub fn encode_response(outcome: &Outcome<Vec<String>>) -> String {
    let mut line = match outcome {
        Outcome::Ok(fields) => {
            let mut s = "OK".to_owned();
            for field in fields {
                s.push(FIELD_SEP);
                s.push_str(field);
            }
            s
        }
        Outcome::Err(message) => format!("ERR{FIELD_SEP}{message}"),
    };
    line.push('\n');
    line
}

/// Decodes a response line into an [`Outcome`].
pub fn decode_response(line: &str) -> Outcome<Vec<String>> {
    let trimmed = line.trim_end_matches(['\n', '\r']);
    let mut fields = trimmed.split(FIELD_SEP);
    match fields.next() {
        Some("OK") => Outcome::Ok(fields.map(str::to_owned).collect()),
        Some("ERR") => Outcome::Err(fields.collect::<Vec<_>>().join(FIELD_SEP.to_string().as_str())),
        _ => Outcome::Err(format!("malformed response line: {line:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips() {
        let args = vec!["a".to_owned(), "b c".to_owned()];
        let line = encode_request("ping", &args);
        assert_eq!(decode_request(&line), Some(("ping".to_owned(), args)));
    }

    #[test]
    fn ok_response_round_trips() {
        let outcome = Outcome::Ok(vec!["1".to_owned(), "2".to_owned()]);
        assert_eq!(decode_response(&encode_response(&outcome)), outcome);
    }

    #[test]
    fn err_response_round_trips() {
        let outcome = Outcome::Err("no space left".to_owned());
        assert_eq!(decode_response(&encode_response(&outcome)), outcome);
    }

    #[test]
    fn malformed_line_decodes_to_err() {
        match decode_response("garbage\n") {
            Outcome::Err(_) => {}
            other => panic!("expected Err, got {other:?}"),
        }
    }
}
