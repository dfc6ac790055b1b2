//! `key = value` text codec for [`ControlRecord`].

use std::fmt::Write as _;

use thiserror::Error;

use crate::record::ControlRecord;

/// Errors surfaced while parsing a `_control` file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    /// A required built-in field was missing.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    /// A numeric field could not be parsed.
    #[error("invalid value for field `{field}`: {value}")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// The raw text that failed to parse.
        value: String,
    },
    /// A line was not in `key = value` form.
    #[error("malformed line: {0:?}")]
    MalformedLine(String),
}

const KEY_QUEUE: &str = "queue";
const KEY_HOST: &str = "host";
const KEY_QPATH: &str = "qpath";
const KEY_ONAME: &str = "oname";
const KEY_FNAME: &str = "fname";
const KEY_SPATH: &str = "spath";
const KEY_FULL: &str = "full";
const KEY_FSIZE: &str = "fsize";
const KEY_SUM32: &str = "sum32";
const KEY_CRC32: &str = "crc32";
const KEY_MD5: &str = "md5";
const KEY_ISDIR: &str = "isdir";
const KEY_ITIME: &str = "itime";
const KEY_DNAME: &str = "dname";
const PARAM_PREFIX: &str = "param_";

/// Serializes `record` into the canonical `_control` text form.
///
/// Built-in fields are always emitted first, in the fixed order of spec §3;
/// `delivery_name` is omitted entirely when absent rather than written as an
/// empty value, so a later [`parse`] treats it as "not overridden" rather
/// than "overridden with the empty string". Parameters follow, in the order
/// they are stored.
pub fn emit(record: &ControlRecord) -> String {
    let mut out = String::new();
    let mut line = |key: &str, value: &dyn std::fmt::Display| {
        let _ = writeln!(out, "{key} = {value}");
    };

    line(KEY_QUEUE, &record.origin_queue);
    line(KEY_HOST, &record.origin_host);
    line(KEY_QPATH, &record.queue_path);
    line(KEY_ONAME, &record.original_name);
    line(KEY_FNAME, &record.transfer_name);
    line(KEY_SPATH, &record.source_path);
    line(KEY_FULL, &record.ingest_path);
    line(KEY_FSIZE, &record.file_size);
    line(KEY_SUM32, &record.sum32);
    line(KEY_CRC32, &record.crc32);
    line(KEY_MD5, &record.md5);
    line(KEY_ISDIR, &record.is_directory);
    line(KEY_ITIME, &record.ingest_time);
    if let Some(dname) = &record.delivery_name {
        line(KEY_DNAME, dname);
    }
    for (key, value) in &record.params {
        let _ = writeln!(out, "{PARAM_PREFIX}{key} = {value}");
    }
    out
}

/// Parses a `_control` file's text contents into a [`ControlRecord`].
///
/// Tolerant of surrounding whitespace around `key` and `value` and of blank
/// lines; any key that is not one of the built-in fields above (with or
/// without the `param_` prefix) is preserved verbatim as a parameter so a
/// hop that cannot interpret a field still forwards it.
pub fn parse(text: &str) -> Result<ControlRecord, ControlError> {
    let mut record = ControlRecord::default();
    let mut seen_fsize = false;
    let mut seen_sum32 = false;
    let mut seen_crc32 = false;
    let mut seen_itime = false;

    for raw_line in text.lines() {
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some((key_raw, value_raw)) = trimmed.split_once('=') else {
            return Err(ControlError::MalformedLine(raw_line.to_string()));
        };
        let key = key_raw.trim();
        let value = value_raw.trim();

        match key {
            KEY_QUEUE => record.origin_queue = value.to_string(),
            KEY_HOST => record.origin_host = value.to_string(),
            KEY_QPATH => record.queue_path = value.to_string(),
            KEY_ONAME => record.original_name = value.to_string(),
            KEY_FNAME => record.transfer_name = value.to_string(),
            KEY_SPATH => record.source_path = value.to_string(),
            KEY_FULL => record.ingest_path = value.to_string(),
            KEY_FSIZE => {
                record.file_size = parse_num(KEY_FSIZE, value)?;
                seen_fsize = true;
            }
            KEY_SUM32 => {
                record.sum32 = parse_num(KEY_SUM32, value)?;
                seen_sum32 = true;
            }
            KEY_CRC32 => {
                record.crc32 = parse_num(KEY_CRC32, value)?;
                seen_crc32 = true;
            }
            KEY_MD5 => record.md5 = value.to_string(),
            KEY_ISDIR => record.is_directory = parse_bool(value),
            KEY_ITIME => {
                record.ingest_time = parse_num(KEY_ITIME, value)?;
                seen_itime = true;
            }
            KEY_DNAME => record.delivery_name = Some(value.to_string()),
            _ => {
                let name = key.strip_prefix(PARAM_PREFIX).unwrap_or(key);
                record.set_param(name, value);
            }
        }
    }

    if record.origin_queue.is_empty() {
        return Err(ControlError::MissingField(KEY_QUEUE));
    }
    if !seen_fsize {
        return Err(ControlError::MissingField(KEY_FSIZE));
    }
    if !seen_sum32 {
        return Err(ControlError::MissingField(KEY_SUM32));
    }
    if !seen_crc32 {
        return Err(ControlError::MissingField(KEY_CRC32));
    }
    if !seen_itime {
        return Err(ControlError::MissingField(KEY_ITIME));
    }

    Ok(record)
}

fn parse_num<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ControlError> {
    value.parse().map_err(|_| ControlError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "y" | "yes" | "t" | "true"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ControlRecord {
        ControlRecord {
            origin_queue: "q1".to_string(),
            origin_host: "ingest01".to_string(),
            queue_path: "spool/q1/0".to_string(),
            original_name: "data.fits".to_string(),
            transfer_name: "data.fits".to_string(),
            source_path: "/home/submit/data.fits".to_string(),
            ingest_path: "ingest01!/home/submit/data.fits".to_string(),
            file_size: 5_242_880,
            sum32: 123_456,
            crc32: 0xDEAD_BEEF,
            md5: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
            is_directory: false,
            ingest_time: 1_700_000_000,
            delivery_name: None,
            params: vec![("foo".to_string(), "bar baz".to_string())],
        }
    }

    #[test]
    fn round_trips() {
        let record = sample();
        let text = emit(&record);
        let parsed = parse(&text).expect("parses");
        assert_eq!(parsed, record);
    }

    #[test]
    fn preserves_unknown_keys_as_parameters() {
        let text = "\
queue = q1
host = h
qpath = spool/q1/0
oname = f
fname = f
spath = /a/f
full = h!/a/f
fsize = 0
sum32 = 0
crc32 = 0
md5 = d41d8cd98f00b204e9800998ecf8427e
isdir = 0
itime = 1
future_field = kept
";
        let parsed = parse(text).expect("parses despite unknown key");
        assert_eq!(parsed.param("future_field"), Some("kept"));
    }

    #[test]
    fn tolerates_whitespace() {
        let text = "   queue   =   q1  \nfsize=0\nsum32=0\ncrc32=0\nitime=0\n";
        let parsed = parse(text).expect("parses");
        assert_eq!(parsed.origin_queue, "q1");
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let err = parse("host = h\n").unwrap_err();
        assert_eq!(err, ControlError::MissingField(KEY_QUEUE));
    }

    #[test]
    fn malformed_line_is_an_error() {
        let err = parse("queue q1\n").unwrap_err();
        assert!(matches!(err, ControlError::MalformedLine(_)));
    }

    #[test]
    fn delivery_name_omitted_when_absent() {
        let record = sample();
        let text = emit(&record);
        assert!(!text.contains("dname"));
    }

    #[test]
    fn effective_delivery_name_falls_back_to_original() {
        let record = sample();
        assert_eq!(record.effective_delivery_name(), "data.fits");
    }
}
