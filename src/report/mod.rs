pub mod theme;

use serde::Serialize;

use crate::format::{
    NOT_AVAILABLE, format_bytes, format_decimal_with, format_percentage, pad_left, pad_right,
};
use crate::system::disk::DiskUsage;
use crate::system::info::{FailedLogins, UserInfo};
use crate::system::memory::MemoryUsage;
use crate::system::process::{ProcessEntry, RankBy};
use crate::system::{RunStats, Snapshot};
use theme::{Thresholds, heading, paint};

const KEY_WIDTH: usize = 16;
const PID_WIDTH: usize = 8;
const NAME_WIDTH: usize = 16;
const METRIC_WIDTH: usize = 9;
const BAR_CELLS: usize = 20;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub thresholds: Thresholds,
    pub color: bool,
}

struct Report<'a> {
    options: &'a ReportOptions,
    lines: Vec<String>,
}

impl Report<'_> {
    fn section(&mut self, title: &str) {
        if !self.lines.is_empty() {
            self.lines.push(String::new());
        }
        let title = format!("== {title} ==");
        self.lines.push(heading(&title, self.options.color));
    }

    fn field(&mut self, key: &str, value: impl AsRef<str>) {
        self.lines
            .push(format!("{}{}", pad_right(&format!("{key}:"), KEY_WIDTH), value.as_ref()));
    }

    fn percent(&self, value: f64) -> String {
        let severity = self.options.thresholds.severity(value);
        paint(&format_percentage(value), severity, self.options.color)
    }

    fn amount(&self, bytes: u64, percent: f64) -> String {
        format!("{} ({})", format_bytes(bytes), self.percent(percent))
    }

    fn finish(self) -> String {
        let mut out = self
            .lines
            .iter()
            .map(|line| line.trim_end())
            .collect::<Vec<_>>()
            .join("\n");
        out.push('\n');
        out
    }
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// `[#######-------------]` with one cell per 5%.
pub fn usage_bar(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_CELLS as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_CELLS - filled))
}

pub fn users_label(users: &UserInfo) -> String {
    if users.user_names.is_empty() {
        return users.user_count.to_string();
    }
    let mut names = users.user_names.join(", ");
    if users.overflow_count > 0 {
        names.push_str(&format!(", +{} more", users.overflow_count));
    }
    format!("{} ({names})", users.user_count)
}

pub fn failed_logins_label(failed: FailedLogins) -> String {
    match failed {
        FailedLogins::Count(count) => count.to_string(),
        FailedLogins::PermissionDenied => "permission denied".to_string(),
        FailedLogins::Unavailable => NOT_AVAILABLE.to_string(),
    }
}

pub fn process_table(entries: &[ProcessEntry], rank: RankBy) -> Vec<String> {
    if entries.is_empty() {
        return vec!["no process data available".to_string()];
    }
    let metric_title = match rank {
        RankBy::Cpu => "CPU%",
        RankBy::Memory => "MEM(MB)",
    };
    let mut rows = vec![format!(
        "{}{}{}",
        pad_right("PID", PID_WIDTH),
        pad_right("NAME", NAME_WIDTH),
        pad_left(metric_title, METRIC_WIDTH)
    )];
    rows.extend(entries.iter().map(|entry| {
        format!(
            "{}{}{}",
            pad_right(&entry.pid.to_string(), PID_WIDTH),
            pad_right(&entry.name, NAME_WIDTH),
            pad_left(&format_decimal_with(entry.metric, 1), METRIC_WIDTH)
        )
    }));
    rows
}

impl Report<'_> {
    fn header(&mut self, snapshot: &Snapshot) {
        let host = snapshot.system.hostname.as_deref().unwrap_or(NOT_AVAILABLE);
        self.lines.push(heading(
            &format!(
                "Performance snapshot: {host} ({}) at {}",
                snapshot.platform.label(),
                snapshot.collected_at.format(TIMESTAMP_FORMAT)
            ),
            self.options.color,
        ));
    }

    fn system(&mut self, snapshot: &Snapshot) {
        let system = &snapshot.system;
        self.section("System");
        self.field("Hostname", or_na(system.hostname.clone()));
        self.field("OS", or_na(system.os_label.clone()));
        self.field("Kernel", or_na(system.kernel.clone()));
        self.field("Uptime", or_na(system.uptime_label()));
        self.field("Load average", or_na(system.load_average_label()));
    }

    fn cpu(&mut self, cpu_percent: Option<f64>) {
        self.section("CPU");
        let usage = match cpu_percent {
            Some(pct) => format!("{} {}", self.percent(pct), usage_bar(pct)),
            None => NOT_AVAILABLE.to_string(),
        };
        self.field("Usage", usage);
    }

    fn memory(&mut self, memory: Option<&MemoryUsage>) {
        self.section("Memory");
        match memory {
            Some(mem) => {
                let total = format_bytes(mem.total_bytes);
                let used = self.amount(mem.used_bytes, mem.used_percent);
                let available = self.amount(mem.available_bytes, mem.available_percent);
                self.field("Total", total);
                self.field("Used", used);
                self.field("Available", available);
            }
            None => {
                for key in ["Total", "Used", "Available"] {
                    self.field(key, NOT_AVAILABLE);
                }
            }
        }
    }

    fn disk(&mut self, path: &str, disk: Option<&DiskUsage>) {
        self.section(&format!("Disk ({path})"));
        match disk {
            Some(disk) => {
                let filesystem = disk
                    .filesystem
                    .clone()
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string());
                let used = self.amount(disk.used_bytes, disk.used_percent);
                self.field("Filesystem", filesystem);
                self.field("Total", format_bytes(disk.total_bytes));
                self.field("Used", used);
                self.field("Available", format_bytes(disk.available_bytes));
            }
            None => {
                for key in ["Filesystem", "Total", "Used", "Available"] {
                    self.field(key, NOT_AVAILABLE);
                }
            }
        }
    }

    fn processes(&mut self, title: &str, entries: &[ProcessEntry], rank: RankBy) {
        self.section(title);
        self.lines.extend(process_table(entries, rank));
    }

    fn users(&mut self, users: Option<&UserInfo>, failed: FailedLogins) {
        self.section("Users");
        self.field("Logged in", or_na(users.map(users_label)));
        self.field("Failed logins", failed_logins_label(failed));
    }

    fn summary(&mut self, stats: &RunStats) {
        self.section("Summary");
        self.field(
            "Collected",
            format!("{}/{} core metrics", stats.collected, stats.total()),
        );
        if !stats.unavailable.is_empty() {
            let missing: Vec<&str> = stats.unavailable.iter().map(|m| m.label()).collect();
            self.field("Unavailable", missing.join(", "));
        }
        self.field("Elapsed", format!("{:.2}s", stats.elapsed.as_secs_f64()));
    }
}

/// Full text report. No line carries trailing whitespace.
pub fn render_text(snapshot: &Snapshot, stats: &RunStats, options: &ReportOptions) -> String {
    let mut report = Report {
        options,
        lines: Vec::new(),
    };
    report.header(snapshot);
    report.system(snapshot);
    report.cpu(snapshot.cpu_percent);
    report.memory(snapshot.memory.as_ref());
    report.disk(&snapshot.disk_path, snapshot.disk.as_ref());
    report.processes("Top processes by CPU", &snapshot.cpu_processes, RankBy::Cpu);
    report.processes(
        "Top processes by memory",
        &snapshot.memory_processes,
        RankBy::Memory,
    );
    report.users(snapshot.users.as_ref(), snapshot.failed_logins);
    report.summary(stats);
    report.finish()
}

#[derive(Serialize)]
struct JsonReport<'a> {
    snapshot: &'a Snapshot,
    stats: &'a RunStats,
}

pub fn render_json(snapshot: &Snapshot, stats: &RunStats) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport { snapshot, stats })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{Local, TimeZone};

    use super::*;
    use crate::system::platform::Platform;

    fn empty_run() -> (Snapshot, RunStats) {
        let at = Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let snapshot = Snapshot::unavailable(Platform::Linux, at, "/");
        let stats = RunStats::from_snapshot(&snapshot, Duration::from_millis(1250));
        (snapshot, stats)
    }

    #[test]
    fn bar_cells() {
        assert_eq!(usage_bar(0.0), "[--------------------]");
        assert_eq!(usage_bar(25.0), "[#####---------------]");
        assert_eq!(usage_bar(100.0), "[####################]");
        assert_eq!(usage_bar(140.0), "[####################]");
    }

    #[test]
    fn users_overflow_label() {
        let users = UserInfo::from_names(["a", "b", "c", "d", "e", "f", "g"]);
        assert_eq!(users_label(&users), "7 (a, b, c, d, e, +2 more)");
        assert_eq!(users_label(&UserInfo::default()), "0");
    }

    #[test]
    fn failed_login_states() {
        assert_eq!(failed_logins_label(FailedLogins::Count(3)), "3");
        assert_eq!(
            failed_logins_label(FailedLogins::PermissionDenied),
            "permission denied"
        );
        assert_eq!(failed_logins_label(FailedLogins::Unavailable), "N/A");
    }

    #[test]
    fn empty_process_list_notice() {
        assert_eq!(
            process_table(&[], RankBy::Cpu),
            vec!["no process data available".to_string()]
        );
    }

    #[test]
    fn unavailable_report_renders_every_section() {
        let (snapshot, stats) = empty_run();
        let text = render_text(&snapshot, &stats, &ReportOptions::default());
        for section in ["System", "CPU", "Memory", "Disk (/)", "Users", "Summary"] {
            assert!(text.contains(&format!("== {section} ==")), "missing {section}");
        }
        assert!(text.contains("Collected:      0/5 core metrics"));
        assert!(text.lines().all(|line| line == line.trim_end()));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn json_carries_snapshot_and_stats() {
        let (snapshot, stats) = empty_run();
        let json: serde_json::Value =
            serde_json::from_str(&render_json(&snapshot, &stats).unwrap()).unwrap();
        assert_eq!(json["snapshot"]["platform"], "linux");
        assert!(json["snapshot"]["cpu_percent"].is_null());
        assert_eq!(json["snapshot"]["failed_logins"], "unavailable");
        assert_eq!(json["stats"]["collected"], 0);
    }
}
