//! The delivery stage (spec §4.6): macro substitution, delivery-command
//! execution, exit-code mapping, `.par` absorption, and the delivery
//! filename collision policy.

use std::path::{Path, PathBuf};
use std::process::Command;

use config::{DeliveryPolicy, QueueConfig};
use control::ControlRecord;

use crate::error::DeliveryError;

/// Outcome of running the delivery command (spec §4.6 exit-code table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Exit 0: full success.
    Success,
    /// Exit 1: minor — logged, still counts as success.
    Minor,
    /// Exit 2: fatal for this object — caller creates an `ERR` marker.
    FatalForObject,
    /// Exit 3: fatal for the whole queue — caller pauses the queue.
    FatalForQueue,
    /// Any other non-zero exit: unknown error, logged.
    Unknown(i32),
}

/// Expands `cmd_template`'s macros against `control` and its absorbed
/// parameters (spec §4.6 "Macro substitution table"). Substitution is
/// left-to-right, single-pass: arbitrary `$<param>` keys are tried before
/// the built-ins so a parameter named e.g. `foo` cannot collide with a
/// built-in macro name that happens to match.
pub fn expand_macros(cmd_template: &str, control: &ControlRecord, queue: &QueueConfig) -> String {
    let mut result = cmd_template.to_owned();

    for (key, value) in &control.params {
        result = result.replace(&format!("${key}"), value);
    }

    let delivery_dir = queue
        .delivery_dir
        .as_deref()
        .unwrap_or_else(|| Path::new("."));
    let delivered_original = delivery_dir.join(&control.original_name);
    let delivered_by_dname = delivery_dir.join(control.effective_delivery_name());

    let substitutions: [(&str, String); 14] = [
        ("$F", delivered_original.display().to_string()),
        ("$D", delivered_by_dname.display().to_string()),
        ("$Q", queue.name.clone()),
        ("$QP", control.queue_path.clone()),
        ("$SUM32", control.sum32.to_string()),
        ("$CRC32", control.crc32.to_string()),
        ("$MD5", control.md5.clone()),
        ("$FULL", control.ingest_path.clone()),
        ("$ON", control.original_name.clone()),
        ("$OP", control.source_path.clone()),
        ("$DN", control.effective_delivery_name().to_owned()),
        ("$DP", delivery_dir.display().to_string()),
        ("$SP", control.source_path.clone()),
        ("$OH", control.origin_host.clone()),
    ];
    for (macro_name, value) in substitutions {
        result = result.replace(macro_name, &value);
    }
    result = result.replace("$S", &control.file_size.to_string());
    result = result.replace("$E", &control.ingest_time.to_string());

    result
}

/// Runs the expanded delivery command in `working_dir` (the slot
/// directory), returning how the exit status maps onto spec §4.6's
/// table.
pub fn run_delivery_command(
    expanded_cmd: &str,
    working_dir: &Path,
) -> Result<DeliveryOutcome, DeliveryError> {
    let mut parts = expanded_cmd.split_whitespace();
    let program = parts.next().unwrap_or("true");
    let status = Command::new(program)
        .args(parts)
        .current_dir(working_dir)
        .status()
        .map_err(DeliveryError::Spawn)?;

    Ok(match status.code() {
        Some(0) | None => DeliveryOutcome::Success,
        Some(1) => DeliveryOutcome::Minor,
        Some(2) => DeliveryOutcome::FatalForObject,
        Some(3) => DeliveryOutcome::FatalForQueue,
        Some(other) => DeliveryOutcome::Unknown(other),
    })
}

/// Absorbs `<queueName>.par`'s `key = value` pairs into `control`, if the
/// file exists in the slot (spec §4.6 "On success, if a file
/// `<queueName>.par` exists in the slot, absorb its key = value pairs").
pub fn absorb_par_file(
    slot_dir: &Path,
    queue_name: &str,
    control: &mut ControlRecord,
) -> Result<bool, DeliveryError> {
    let par_path = slot_dir.join(format!("{queue_name}.par"));
    if !par_path.exists() {
        return Ok(false);
    }
    let text = std::fs::read_to_string(&par_path)?;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            control.set_param(key.trim().to_owned(), value.trim().to_owned());
        }
    }
    Ok(true)
}

/// Places the delivered file into `queue.delivery_dir` under the queue's
/// collision policy (spec §4.6 "Delivery filename policy").
pub fn place_delivered_file(
    delivered_path: &Path,
    queue: &QueueConfig,
    control: &ControlRecord,
) -> Result<PathBuf, DeliveryError> {
    let delivery_dir = queue
        .delivery_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&delivery_dir)?;
    let target_name = control.effective_delivery_name();
    let mut target = delivery_dir.join(target_name);

    if target.exists() {
        match queue.delivery_policy {
            DeliveryPolicy::Replace => {
                std::fs::remove_file(&target).ok();
            }
            DeliveryPolicy::Number => {
                let mut suffix = 1u32;
                loop {
                    let candidate = delivery_dir.join(format!("{target_name}.{suffix}"));
                    if !candidate.exists() {
                        target = candidate;
                        break;
                    }
                    suffix += 1;
                }
            }
            DeliveryPolicy::Original => {
                return Err(DeliveryError::FilenameCollision(
                    target.display().to_string(),
                ));
            }
        }
    }

    std::fs::rename(delivered_path, &target)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{ChecksumPolicy, QueueType, TransferMode, TransportMethod};

    fn sample_queue() -> QueueConfig {
        QueueConfig {
            name: "q1".into(),
            qtype: QueueType::Endpoint,
            node: "B".into(),
            src: None,
            dest: None,
            purge: true,
            delivery_dir: Some(PathBuf::from("/out")),
            delivery_cmd: Some("/bin/echo $F $MD5 $foo".into()),
            checksum_policy: ChecksumPolicy::None,
            delivery_policy: DeliveryPolicy::Replace,
            deliver_as: None,
            method: TransportMethod::Tcp,
            mode: TransferMode::Push,
            nthreads: 4,
            port: None,
            keepalive: true,
            udt_rate: None,
        }
    }

    fn sample_control() -> ControlRecord {
        ControlRecord {
            origin_queue: "ingest".into(),
            origin_host: "A".into(),
            queue_path: "spool/q1/3".into(),
            original_name: "object.dat".into(),
            transfer_name: "object.dat".into(),
            source_path: "/data/object.dat".into(),
            ingest_path: "A!/data/object.dat".into(),
            file_size: 1024,
            sum32: 42,
            crc32: 99,
            md5: "d41d8cd98f00b204e9800998ecf8427e".into(),
            is_directory: false,
            ingest_time: 1_700_000_000,
            delivery_name: None,
            params: vec![("foo".into(), "bar baz".into())],
        }
    }

    #[test]
    fn macro_expansion_fidelity() {
        let queue = sample_queue();
        let control = sample_control();
        let expanded = expand_macros(queue.delivery_cmd.as_deref().unwrap(), &control, &queue);
        assert_eq!(
            expanded,
            "/bin/echo /out/object.dat d41d8cd98f00b204e9800998ecf8427e bar baz"
        );
    }

    #[test]
    fn arbitrary_params_resolve_before_built_ins() {
        let queue = sample_queue();
        let mut control = sample_control();
        control.set_param("Q", "shadowed");
        let expanded = expand_macros("$Q/$QP", &control, &queue);
        assert_eq!(expanded, "shadowed/spool/q1/3");
    }

    #[test]
    fn par_file_absorption_sets_parameters() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("q1.par"), "extra = value\n# comment\n").unwrap();
        let mut control = sample_control();
        let absorbed = absorb_par_file(dir.path(), "q1", &mut control).unwrap();
        assert!(absorbed);
        assert_eq!(control.param("extra"), Some("value"));
    }

    #[test]
    fn replace_policy_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let delivered = dir.path().join("incoming");
        std::fs::write(&delivered, b"new").unwrap();
        let mut queue = sample_queue();
        queue.delivery_dir = Some(dir.path().join("out"));
        std::fs::create_dir_all(queue.delivery_dir.as_ref().unwrap()).unwrap();
        std::fs::write(queue.delivery_dir.as_ref().unwrap().join("object.dat"), b"old").unwrap();

        let control = sample_control();
        let placed = place_delivered_file(&delivered, &queue, &control).unwrap();
        assert_eq!(std::fs::read(&placed).unwrap(), b"new");
    }

    #[test]
    fn original_policy_refuses_on_collision() {
        let dir = tempfile::tempdir().unwrap();
        let delivered = dir.path().join("incoming");
        std::fs::write(&delivered, b"new").unwrap();
        let mut queue = sample_queue();
        queue.delivery_policy = DeliveryPolicy::Original;
        queue.delivery_dir = Some(dir.path().join("out"));
        std::fs::create_dir_all(queue.delivery_dir.as_ref().unwrap()).unwrap();
        std::fs::write(queue.delivery_dir.as_ref().unwrap().join("object.dat"), b"old").unwrap();

        let control = sample_control();
        let result = place_delivered_file(&delivered, &queue, &control);
        assert!(matches!(result, Err(DeliveryError::FilenameCollision(_))));
    }

    #[test]
    fn exit_status_two_is_fatal_for_object() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fail.sh");
        std::fs::write(&script, "#!/bin/sh\nexit 2\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        let outcome = run_delivery_command(&script.display().to_string(), dir.path()).unwrap();
        assert_eq!(outcome, DeliveryOutcome::FatalForObject);
    }

    #[test]
    fn exit_status_zero_is_success() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_delivery_command("/bin/true", dir.path()).unwrap();
        assert_eq!(outcome, DeliveryOutcome::Success);
    }
}
