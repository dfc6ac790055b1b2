//! Property test for the `_control` codec round-trip invariant (spec §8).

use control::{emit, parse, ControlRecord};
use proptest::prelude::*;

fn arb_record() -> impl Strategy<Value = ControlRecord> {
    (
        "[a-z0-9_]{1,12}",
        "[a-z0-9.]{1,12}",
        "[a-z0-9/]{1,20}",
        "[a-zA-Z0-9_.]{1,16}",
        any::<u64>(),
        any::<u32>(),
        any::<u32>(),
        any::<bool>(),
        any::<i64>(),
        proptest::collection::vec(("[a-z]{1,8}", "[a-zA-Z0-9 ]{0,16}"), 0..4),
    )
        .prop_map(
            |(queue, host, qpath, name, fsize, sum32, crc32, isdir, itime, params)| {
                ControlRecord {
                    origin_queue: queue,
                    origin_host: host,
                    queue_path: qpath.clone(),
                    original_name: name.clone(),
                    transfer_name: name,
                    source_path: format!("/src/{qpath}"),
                    ingest_path: "host!/src/path".to_string(),
                    file_size: fsize,
                    sum32,
                    crc32,
                    md5: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
                    is_directory: isdir,
                    ingest_time: itime,
                    delivery_name: None,
                    params,
                }
            },
        )
}

proptest! {
    #[test]
    fn parse_of_emit_is_identity(record in arb_record()) {
        let text = emit(&record);
        let parsed = parse(&text).expect("well-formed emitted text always parses");
        prop_assert_eq!(parsed, record);
    }
}
