use leakwatch_core::collector::{LinuxProcessTable, ProcessState, ProcessTable};
use leakwatch_core::error::MonitorError;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn fake_process(root: &Path, name: &str, state: &str, stat: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("status"), format!("Name:\tfake\nState:\t{}\nVmRSS:\t    2048 kB\n", state)).unwrap();
    fs::write(dir.join("stat"), format!("{}\n", stat)).unwrap();
}

#[test]
fn test_pids_skip_non_numeric_entries() {
    let dir = tempdir().unwrap();
    fake_process(dir.path(), "1", "R (running)", "1 (init) R 0 1 1");
    fake_process(dir.path(), "42", "Z (zombie)", "42 (defunct) Z 7 42 42");
    fake_process(dir.path(), "abc", "R (running)", "abc");
    fs::write(dir.path().join("stat"), "cpu  1 2 3 4 5 6 7\n").unwrap();

    let table = LinuxProcessTable::with_root(dir.path());
    assert_eq!(table.pids().unwrap(), vec![1, 42]);
}

#[test]
fn test_list_processes_reads_state_and_parent() {
    let dir = tempdir().unwrap();
    fake_process(dir.path(), "1", "S (sleeping)", "1 (init) S 0 1 1");
    fake_process(dir.path(), "42", "Z (zombie)", "42 (defunct) Z 7 42 42");
    fs::create_dir_all(dir.path().join("99")).unwrap(); // vanished mid-scan: no status

    let table = LinuxProcessTable::with_root(dir.path());
    let records = table.list_processes().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].state, ProcessState::Sleeping);
    assert_eq!(records[1].pid, 42);
    assert_eq!(records[1].state, ProcessState::Zombie);
    assert_eq!(records[1].parent_pid, Some(7));
}

#[test]
fn test_missing_root_is_scan_unavailable() {
    let dir = tempdir().unwrap();
    let table = LinuxProcessTable::with_root(dir.path().join("gone"));
    assert!(matches!(table.list_processes(), Err(MonitorError::ScanUnavailable { .. })));
}

#[test]
fn test_real_proc_lists_current_process() {
    let table = LinuxProcessTable::new();
    let current_pid = std::process::id();
    assert!(table.pids().unwrap().contains(&current_pid));
    let state = table.read_state(current_pid).unwrap();
    assert!(matches!(state, ProcessState::Running | ProcessState::Sleeping));
}

#[test]
fn test_read_state_fails_for_invalid_pid() {
    let table = LinuxProcessTable::new();
    assert!(table.read_state(999_999_999).is_err());
}
