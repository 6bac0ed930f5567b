//! End-to-end tests across counters, sampler, classifier and scanner

use leakwatch_core::{
    collector::{LinuxProcessTable, ProcessTable},
    counter::{Counter, CpuCounter, RssCounter},
    detector::{self, LEAK_THRESHOLD_KB, RISING_DELTA_KB},
    error::MonitorError,
    executor,
    injector::{self, LeakInjector},
    sampler::Sampler,
    scanner::{scan_zombies, ZombieRecord},
    series::TimeSeries,
};
use std::fs;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;

fn fake_process(root: &Path, name: &str, state: &str, stat: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("status"), format!("Name:\tfake\nState:\t{}\nVmRSS:\t    2048 kB\n", state)).unwrap();
    fs::write(dir.join("stat"), format!("{}\n", stat)).unwrap();
}

/// Scan a synthetic proc tree with one zombie and one non-pid entry
#[test]
fn test_scan_finds_single_zombie_in_synthetic_root() {
    let root = TempDir::new().unwrap();
    fake_process(root.path(), "1", "R (running)", "1 (init) R 0 1 1 0 -1");
    fake_process(root.path(), "42", "Z (zombie)", "42 (defunct) Z 7 42 42 0 -1");
    fake_process(root.path(), "abc", "Z (zombie)", "abc (x) Z 9");

    let report = scan_zombies(&LinuxProcessTable::with_root(root.path())).unwrap();
    assert_eq!(report.zombies, vec![ZombieRecord { pid: 42, parent_pid: Some(7) }]);
    assert!(report.errors.is_empty());
}

/// A truncated stat line is reported but other zombies are still found
#[test]
fn test_scan_survives_truncated_stat_line() {
    let root = TempDir::new().unwrap();
    fake_process(root.path(), "10", "Z (zombie)", "10 (bad)");
    fake_process(root.path(), "20", "Z (zombie)", "20 (ok) Z 3 20 20");

    let report = scan_zombies(&LinuxProcessTable::with_root(root.path())).unwrap();
    assert_eq!(report.zombies.len(), 2);
    assert_eq!(report.resolved().collect::<Vec<_>>(), vec![(20, 3)]);
    assert!(matches!(
        report.errors.as_slice(),
        [MonitorError::ParentResolutionFailed { pid: 10 }]
    ));
}

/// A pid directory without a status file is skipped, not fatal
#[test]
fn test_scan_skips_pid_without_status() {
    let root = TempDir::new().unwrap();
    fs::create_dir_all(root.path().join("5")).unwrap();
    fake_process(root.path(), "42", "Z (zombie)", "42 (defunct) Z 7 42 42 0 -1");

    let report = scan_zombies(&LinuxProcessTable::with_root(root.path())).unwrap();
    assert_eq!(report.zombies, vec![ZombieRecord { pid: 42, parent_pid: Some(7) }]);
    assert!(report.errors.is_empty());
}

/// SIGKILL through the real process table, then failure once the pid is gone
#[test]
fn test_terminate_real_process() {
    let table = LinuxProcessTable::new();
    let mut child = Command::new("sleep").arg("30").spawn().unwrap();
    let pid = child.id();

    executor::terminate_parent(&table, pid).unwrap();
    let status = child.wait().unwrap();
    assert_eq!(status.signal(), Some(libc::SIGKILL));

    match executor::terminate_parent(&table, pid) {
        Err(MonitorError::RemediationFailed { pid: failed, reason }) => {
            assert_eq!(failed, pid);
            assert!(reason.contains("No such process"), "{}", reason);
        }
        other => panic!("expected RemediationFailed, got {:?}", other),
    }
}

/// A real unreaped child shows up as a zombie of this process
#[test]
fn test_scan_detects_real_zombie_child() {
    let mut child = injector::spawn_zombie(Duration::from_millis(300)).unwrap();
    let report = scan_zombies(&LinuxProcessTable::new()).unwrap();
    let found = report.zombies.iter().find(|z| z.pid == child.id());
    child.wait().unwrap();
    assert_eq!(found.map(|z| z.parent_pid), Some(Some(std::process::id())));
}

/// CPU counter over a synthetic stat file
#[test]
fn test_cpu_counter_on_synthetic_stat() {
    let root = TempDir::new().unwrap();
    let stat = root.path().join("stat");
    fs::write(&stat, "cpu  100 0 100 800 0 0 0 0 0 0\ncpu0 100 0 100 800 0 0 0\n").unwrap();

    let mut counter = CpuCounter::with_root(root.path());
    assert_eq!(counter.read().unwrap(), 0.0);
    // identical totals: no division fault
    assert_eq!(counter.read().unwrap(), 0.0);

    fs::write(&stat, "cpu  150 0 150 900 0 0 0 0 0 0\n").unwrap();
    let busy = counter.read().unwrap();
    assert!((busy - 50.0).abs() < 1e-9, "got {}", busy);
}

#[test]
fn test_cpu_counter_missing_source() {
    let root = TempDir::new().unwrap();
    let mut counter = CpuCounter::with_root(root.path());
    assert!(matches!(counter.read(), Err(MonitorError::CounterUnavailable { .. })));
}

#[test]
fn test_rss_counter_synthetic_and_missing() {
    let root = TempDir::new().unwrap();
    fake_process(root.path(), "5", "S (sleeping)", "5 (x) S 1");
    assert_eq!(RssCounter::with_root(root.path(), 5).read_kb().unwrap(), 2048);
    assert!(matches!(
        RssCounter::with_root(root.path(), 6).read_kb(),
        Err(MonitorError::CounterUnavailable { .. })
    ));
}

/// Sample this process, save the series and read it back
#[test]
fn test_memory_run_writes_two_column_file() {
    let dir = TempDir::new().unwrap();
    let mut counter = RssCounter::current_process();
    let series = Sampler::new(3, 1)
        .unwrap()
        .with_pause(Duration::ZERO)
        .run(&mut counter)
        .unwrap();
    assert_eq!(series.len(), 3);
    assert!(series.values().all(|kb| kb > 0.0));

    let path = dir.path().join("mem_data.txt");
    series.save(&path).unwrap();
    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("0 "));
    assert!(lines.iter().all(|l| l.split(' ').count() == 2));
    assert_eq!(TimeSeries::load(&path).unwrap(), series);
}

/// Sampling a process that does not exist fails the whole run
#[test]
fn test_memory_run_for_missing_pid_fails() {
    let root = TempDir::new().unwrap();
    let mut counter = RssCounter::with_root(root.path(), 4242);
    let result = Sampler::new(2, 1).unwrap().with_pause(Duration::ZERO).run(&mut counter);
    assert!(matches!(result, Err(MonitorError::SamplingFailed { tick: 0, .. })));
}

/// Real allocation growth is visible to the classifier
#[test]
fn test_leak_injector_grows_real_rss() {
    let mut injector = LeakInjector::new().with_pause(Duration::ZERO);
    let mut counter = RssCounter::current_process();
    let run = injector.simulate(&mut counter, 6, 1, true).unwrap();
    assert_eq!(run.series.len(), 6);
    assert_eq!(injector.held_blocks(), 0);
    // 5 intervals of ~390 kB each
    let verdict = run.verdict.unwrap();
    assert!(verdict.net_growth > LEAK_THRESHOLD_KB, "{:?}", verdict);
    assert!(verdict.suspected);
}

/// A one-block run has no verdict but still yields a saveable series
#[test]
fn test_single_block_leak_run_still_writes_series() {
    let dir = TempDir::new().unwrap();
    let mut injector = LeakInjector::new().with_pause(Duration::ZERO);
    let mut counter = RssCounter::current_process();
    let run = injector.simulate(&mut counter, 1, 1, true).unwrap();
    assert!(matches!(run.verdict, Err(MonitorError::InsufficientSamples { len: 1 })));
    assert_eq!(injector.held_blocks(), 0);

    let path = dir.path().join("leak_data.txt");
    run.series.save(&path).unwrap();
    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(content.starts_with("0 "));
}

#[test]
fn test_thresholds_are_fixed() {
    assert_eq!(RISING_DELTA_KB, 8.0);
    assert_eq!(LEAK_THRESHOLD_KB, 100.0);
    let verdict = detector::classify(&TimeSeries::from_values(&[100.0, 105.0, 100.0])).unwrap();
    assert_eq!((verdict.rising_intervals, verdict.flat_or_falling_intervals), (0, 2));
}

#[test]
fn test_process_table_is_object_safe() {
    let table: Box<dyn ProcessTable> = Box::new(LinuxProcessTable::new());
    assert!(!scan_zombies(table.as_ref()).unwrap().zombies.iter().any(|z| z.pid == 0));
}
