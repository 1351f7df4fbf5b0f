use std::time::Duration;

use super::{
    CommandSpec, MetricUnit, PS_AUX_CPU, PS_AUX_MEMORY, ProcessLayout, ProcessMethod,
    ReleaseFile, Strategy, ps_columns, whole_seconds,
};
use crate::system::source::Source;

pub(super) static STRATEGY: Strategy = Strategy {
    cpu_counters: Some("/proc/stat"),
    cpu_sampler: Some(top_sampler),
    cpu_processes: &[
        ProcessMethod {
            command: CommandSpec::new("ps", &["-eo", "pid,pcpu,comm", "--sort=-pcpu"]),
            layout: ps_columns(MetricUnit::Percent),
        },
        PS_AUX_CPU,
        ProcessMethod {
            command: CommandSpec::new("top", &["-b", "-n", "1", "-o", "%CPU"]),
            layout: TOP_CPU,
        },
    ],
    memory_processes: &[
        ProcessMethod {
            command: CommandSpec::new("ps", &["-eo", "pid,rss,comm", "--sort=-rss"]),
            layout: ps_columns(MetricUnit::Kibibytes),
        },
        PS_AUX_MEMORY,
        ProcessMethod {
            command: CommandSpec::new("top", &["-b", "-n", "1", "-o", "%MEM"]),
            layout: TOP_RES,
        },
    ],
    os_release: Some("/etc/os-release"),
    release_files: &[
        ReleaseFile {
            path: "/etc/redhat-release",
            prefix: None,
        },
        ReleaseFile {
            path: "/etc/SuSE-release",
            prefix: None,
        },
        ReleaseFile {
            path: "/etc/alpine-release",
            prefix: Some("Alpine Linux"),
        },
        ReleaseFile {
            path: "/etc/debian_version",
            prefix: Some("Debian"),
        },
    ],
    os_command: None,
};

// PID USER PR NI VIRT RES SHR S %CPU %MEM TIME+ COMMAND
const TOP_CPU: ProcessLayout = ProcessLayout {
    pid_col: 0,
    metric_col: 8,
    command_col: 11,
    command_is_argv: false,
    unit: MetricUnit::Percent,
};

const TOP_RES: ProcessLayout = ProcessLayout {
    pid_col: 0,
    metric_col: 5,
    command_col: 11,
    command_is_argv: false,
    unit: MetricUnit::SizeWithSuffix,
};

fn top_sampler(period: Duration) -> Source {
    Source::command("top", &["-b", "-n", "2", "-d"])
        .with_arg(whole_seconds(period))
        .with_grace(period)
}
