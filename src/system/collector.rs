use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::platform::Platform;
use super::process::RankBy;
use super::snapshot::{RunStats, Snapshot};
use super::source::SourceReader;
use super::{cpu, disk, info, memory, process};

#[derive(Debug, Clone, PartialEq)]
pub struct CollectOptions {
    pub period: Duration,
    pub disk_path: PathBuf,
    pub reserved_tolerance_percent: f64,
}

impl Default for CollectOptions {
    fn default() -> Self {
        CollectOptions {
            period: Duration::from_secs(1),
            disk_path: PathBuf::from("/"),
            reserved_tolerance_percent: 10.0,
        }
    }
}

/// Runs every collector once, in a fixed order, against one reader.
pub struct Collector<R> {
    reader: R,
    platform: Platform,
    options: CollectOptions,
}

impl<R: SourceReader> Collector<R> {
    pub fn new(reader: R, platform: Platform, options: CollectOptions) -> Self {
        Collector {
            reader,
            platform,
            options,
        }
    }

    pub async fn detect(reader: R, options: CollectOptions) -> Self {
        let platform = Platform::detect(&reader).await;
        debug!(?platform, "platform detected");
        Self::new(reader, platform, options)
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub async fn collect(&self) -> (Snapshot, RunStats) {
        let started = Instant::now();
        let collected_at = Local::now();
        let strategy = self.platform.strategy();
        let reader = &self.reader;

        let cpu_percent = cpu::collect(reader, strategy, self.options.period).await;
        let memory = memory::collect(reader).await;
        let disk = disk::collect(
            reader,
            &self.options.disk_path,
            self.options.reserved_tolerance_percent,
        )
        .await;
        let cpu_processes = process::collect(reader, strategy, RankBy::Cpu).await;
        let memory_processes = process::collect(reader, strategy, RankBy::Memory).await;
        let system = info::collect_system(reader, strategy).await;
        let users = info::collect_users(reader).await;
        let failed_logins = info::collect_failed_logins(reader).await;

        let snapshot = Snapshot {
            platform: self.platform,
            collected_at,
            system,
            cpu_percent,
            memory,
            disk_path: self.options.disk_path.display().to_string(),
            disk,
            cpu_processes,
            memory_processes,
            users,
            failed_logins,
        };
        let stats = RunStats::from_snapshot(&snapshot, started.elapsed());
        for metric in &stats.unavailable {
            warn!(metric = metric.label(), "metric unavailable");
        }
        debug!(
            collected = stats.collected,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "collection pass finished"
        );
        (snapshot, stats)
    }
}
