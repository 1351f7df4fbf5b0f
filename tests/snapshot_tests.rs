use std::time::Duration;

use chrono::{Local, TimeZone};
use insta::assert_snapshot;
use perfsnap::report::{ReportOptions, process_table, render_text};
use perfsnap::system::mock::MockSource;
use perfsnap::system::mock::scenarios::{MEMINFO, PS_CPU};
use perfsnap::system::platform::Platform;
use perfsnap::system::process::RankBy;
use perfsnap::system::source::Source;
use perfsnap::system::{CollectOptions, Collector, CoreMetric, RunStats, Snapshot};

const MAX_UNAVAILABLE: usize = 2;

fn quick() -> CollectOptions {
    CollectOptions {
        period: Duration::ZERO,
        ..CollectOptions::default()
    }
}

async fn run(reader: MockSource) -> (Snapshot, RunStats) {
    Collector::detect(reader, quick()).await.collect().await
}

/// Which fields resolved, and where `N/A` lands in the report.
fn shape(snapshot: &Snapshot, stats: &RunStats) -> (Vec<CoreMetric>, Vec<usize>, usize, usize) {
    let text = render_text(snapshot, stats, &ReportOptions::default());
    let na_lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| line.contains("N/A"))
        .map(|(idx, _)| idx)
        .collect();
    (
        stats.unavailable.clone(),
        na_lines,
        snapshot.cpu_processes.len(),
        snapshot.memory_processes.len(),
    )
}

#[tokio::test]
async fn available_host_resolves_every_core_metric() {
    let (snapshot, stats) = run(MockSource::linux_host()).await;

    assert!(stats.unavailable.is_empty(), "{:?}", stats.unavailable);
    assert!(!stats.is_failure(MAX_UNAVAILABLE));

    let text = render_text(&snapshot, &stats, &ReportOptions::default());
    for key in ["Usage:", "Total:", "Used:", "Available:"] {
        for line in text.lines().filter(|line| line.starts_with(key)) {
            assert!(!line.contains("N/A"), "unexpected N/A in {line:?}");
        }
    }
    assert!(!text.contains("no process data available"));
    assert!(text.contains("Collected:      5/5 core metrics"));
    assert!(text.contains("Failed logins:  1"));
    assert!(text.contains("Logged in:      2 (alice, bob)"));
}

#[tokio::test]
async fn empty_host_renders_na_and_fails_past_threshold() {
    let collector = Collector::new(MockSource::empty_host(), Platform::Linux, quick());
    let (mut snapshot, mut stats) = collector.collect().await;

    assert_eq!(stats.unavailable.len(), 5);
    assert!(stats.is_failure(MAX_UNAVAILABLE));

    snapshot.collected_at = Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    stats.elapsed = Duration::from_millis(1250);
    let text = render_text(&snapshot, &stats, &ReportOptions::default());
    assert_snapshot!("unavailable_report", text);
}

#[tokio::test]
async fn partial_host_stays_under_threshold() {
    let mut fs = MockSource::new();
    fs.add_command("uname -s", "Linux\n");
    fs.add_sequence(
        &Source::file("/proc/stat"),
        vec!["cpu 100 0 100 800\n".into(), "cpu 150 0 150 1700\n".into()],
    );
    fs.add_file("/proc/meminfo", MEMINFO);
    fs.add_command("ps -eo pid,pcpu,comm --sort=-pcpu", PS_CPU);

    let (snapshot, stats) = run(fs).await;
    assert_eq!(
        stats.unavailable,
        vec![CoreMetric::Disk, CoreMetric::MemoryProcesses]
    );
    assert!(!stats.is_failure(MAX_UNAVAILABLE));
    assert!((snapshot.cpu_percent.unwrap() - 10.0).abs() < 1e-9);
}

#[tokio::test]
async fn consecutive_runs_have_the_same_shape() {
    let collector = Collector::detect(MockSource::linux_host(), quick()).await;
    let (first, first_stats) = collector.collect().await;
    let (second, second_stats) = collector.collect().await;

    assert_eq!(shape(&first, &first_stats), shape(&second, &second_stats));
    assert_eq!(collector.reader().read_count("/proc/stat"), 4);
}

#[tokio::test]
async fn idempotent_on_an_empty_host() {
    let collector = Collector::new(MockSource::empty_host(), Platform::MacOs, quick());
    let (first, first_stats) = collector.collect().await;
    let (second, second_stats) = collector.collect().await;
    assert_eq!(shape(&first, &first_stats), shape(&second, &second_stats));
}

#[tokio::test]
async fn cpu_process_table_snapshot() {
    let (snapshot, _) = run(MockSource::linux_host()).await;
    let table = process_table(&snapshot.cpu_processes, RankBy::Cpu);
    assert_snapshot!("cpu_process_table", table.join("\n"));
}
