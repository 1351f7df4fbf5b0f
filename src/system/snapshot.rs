use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

use super::disk::DiskUsage;
use super::info::{FailedLogins, SystemInfo, UserInfo};
use super::memory::MemoryUsage;
use super::platform::Platform;
use super::process::ProcessEntry;

/// The five metrics whose absence counts against a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoreMetric {
    Cpu,
    Memory,
    Disk,
    CpuProcesses,
    MemoryProcesses,
}

impl CoreMetric {
    pub const ALL: [CoreMetric; 5] = [
        CoreMetric::Cpu,
        CoreMetric::Memory,
        CoreMetric::Disk,
        CoreMetric::CpuProcesses,
        CoreMetric::MemoryProcesses,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CoreMetric::Cpu => "CPU",
            CoreMetric::Memory => "Memory",
            CoreMetric::Disk => "Disk",
            CoreMetric::CpuProcesses => "CPU processes",
            CoreMetric::MemoryProcesses => "Memory processes",
        }
    }
}

/// Everything one collection pass resolved. `None` and empty lists mean unavailable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub platform: Platform,
    pub collected_at: DateTime<Local>,
    pub system: SystemInfo,
    pub cpu_percent: Option<f64>,
    pub memory: Option<MemoryUsage>,
    pub disk_path: String,
    pub disk: Option<DiskUsage>,
    pub cpu_processes: Vec<ProcessEntry>,
    pub memory_processes: Vec<ProcessEntry>,
    pub users: Option<UserInfo>,
    pub failed_logins: FailedLogins,
}

impl Snapshot {
    pub fn unavailable(platform: Platform, collected_at: DateTime<Local>, disk_path: &str) -> Self {
        Self {
            platform,
            collected_at,
            system: SystemInfo::default(),
            cpu_percent: None,
            memory: None,
            disk_path: disk_path.to_string(),
            disk: None,
            cpu_processes: Vec::new(),
            memory_processes: Vec::new(),
            users: None,
            failed_logins: FailedLogins::Unavailable,
        }
    }

    pub fn is_available(&self, metric: CoreMetric) -> bool {
        match metric {
            CoreMetric::Cpu => self.cpu_percent.is_some(),
            CoreMetric::Memory => self.memory.is_some(),
            CoreMetric::Disk => self.disk.is_some(),
            CoreMetric::CpuProcesses => !self.cpu_processes.is_empty(),
            CoreMetric::MemoryProcesses => !self.memory_processes.is_empty(),
        }
    }

    pub fn unavailable_core_metrics(&self) -> Vec<CoreMetric> {
        CoreMetric::ALL
            .into_iter()
            .filter(|&metric| !self.is_available(metric))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStats {
    #[serde(serialize_with = "as_seconds")]
    pub elapsed: Duration,
    pub collected: usize,
    pub unavailable: Vec<CoreMetric>,
}

fn as_seconds<S: serde::Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

impl RunStats {
    pub fn from_snapshot(snapshot: &Snapshot, elapsed: Duration) -> Self {
        let unavailable = snapshot.unavailable_core_metrics();
        Self {
            elapsed,
            collected: CoreMetric::ALL.len() - unavailable.len(),
            unavailable,
        }
    }

    pub fn total(&self) -> usize {
        CoreMetric::ALL.len()
    }

    /// True when more than `max_unavailable` core metrics are missing.
    pub fn is_failure(&self, max_unavailable: usize) -> bool {
        self.unavailable.len() > max_unavailable
    }
}
