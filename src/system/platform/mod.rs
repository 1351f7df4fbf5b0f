use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use super::source::{Source, SourceReader};

mod bsd;
mod linux;
mod macos;
mod other;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOs,
    Bsd,
    Other,
}

impl Platform {
    pub fn from_kernel_name(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "linux" => Platform::Linux,
            "darwin" | "macos" => Platform::MacOs,
            n if n.ends_with("bsd") || n == "dragonfly" => Platform::Bsd,
            _ => Platform::Other,
        }
    }

    pub async fn detect<R: SourceReader>(reader: &R) -> Self {
        match reader.read(&Source::command("uname", &["-s"])).await {
            Ok(name) => Self::from_kernel_name(&name),
            Err(err) => {
                debug!(error = %err, "uname unavailable, using build target OS");
                Self::from_kernel_name(std::env::consts::OS)
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Platform::Linux => "Linux",
            Platform::MacOs => "macOS",
            Platform::Bsd => "BSD",
            Platform::Other => "Unix",
        }
    }

    pub fn strategy(self) -> &'static Strategy {
        match self {
            Platform::Linux => &linux::STRATEGY,
            Platform::MacOs => &macos::STRATEGY,
            Platform::Bsd => &bsd::STRATEGY,
            Platform::Other => &other::STRATEGY,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub program: &'static str,
    pub args: &'static [&'static str],
}

impl CommandSpec {
    pub const fn new(program: &'static str, args: &'static [&'static str]) -> Self {
        Self { program, args }
    }

    pub fn source(&self) -> Source {
        Source::command(self.program, self.args)
    }
}

/// How the ranking column of a process listing is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    /// A percentage, optionally with a trailing `%`.
    Percent,
    /// A plain kilobyte count.
    Kibibytes,
    /// A size like `512M`, `1.2g` or `300`, the bare number meaning kilobytes.
    SizeWithSuffix,
}

#[derive(Debug, Clone, Copy)]
pub struct ProcessLayout {
    pub pid_col: usize,
    pub metric_col: usize,
    pub command_col: usize,
    /// The command column holds a full argv; only its first word names the program.
    pub command_is_argv: bool,
    pub unit: MetricUnit,
}

#[derive(Debug, Clone, Copy)]
pub struct ProcessMethod {
    pub command: CommandSpec,
    pub layout: ProcessLayout,
}

#[derive(Debug, Clone, Copy)]
pub struct ReleaseFile {
    pub path: &'static str,
    pub prefix: Option<&'static str>,
}

/// Everything a collector needs that differs by OS family.
#[derive(Debug)]
pub struct Strategy {
    /// Cumulative tick counter file, `/proc/stat` style.
    pub cpu_counters: Option<&'static str>,
    /// Builds a two-iteration batch `top` run spanning the sampling period.
    pub cpu_sampler: Option<fn(Duration) -> Source>,
    pub cpu_processes: &'static [ProcessMethod],
    pub memory_processes: &'static [ProcessMethod],
    pub os_release: Option<&'static str>,
    pub release_files: &'static [ReleaseFile],
    /// Family-specific OS description command, e.g. `sw_vers`.
    pub os_command: Option<CommandSpec>,
}

/// BSD-style `ps aux`, understood by every family; used when sort flags are not.
pub(crate) const PS_AUX_CPU: ProcessMethod = ProcessMethod {
    command: CommandSpec::new("ps", &["aux"]),
    layout: ProcessLayout {
        pid_col: 1,
        metric_col: 2,
        command_col: 10,
        command_is_argv: true,
        unit: MetricUnit::Percent,
    },
};

pub(crate) const PS_AUX_MEMORY: ProcessMethod = ProcessMethod {
    command: CommandSpec::new("ps", &["aux"]),
    layout: ProcessLayout {
        pid_col: 1,
        metric_col: 5,
        command_col: 10,
        command_is_argv: true,
        unit: MetricUnit::Kibibytes,
    },
};

/// `pid,<metric>,comm` output from `ps -o`.
pub(crate) const fn ps_columns(unit: MetricUnit) -> ProcessLayout {
    ProcessLayout {
        pid_col: 0,
        metric_col: 1,
        command_col: 2,
        command_is_argv: false,
        unit,
    }
}

/// `top` delay arguments accept whole seconds on most families.
pub(crate) fn whole_seconds(period: Duration) -> String {
    period.as_secs().max(1).to_string()
}
