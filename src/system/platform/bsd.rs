use std::time::Duration;

use super::{
    CommandSpec, MetricUnit, PS_AUX_CPU, PS_AUX_MEMORY, ProcessLayout, ProcessMethod, Strategy,
    ps_columns, whole_seconds,
};
use crate::system::source::Source;

pub(super) static STRATEGY: Strategy = Strategy {
    cpu_counters: None,
    cpu_sampler: Some(top_sampler),
    cpu_processes: &[
        ProcessMethod {
            command: CommandSpec::new("ps", &["-axo", "pid,pcpu,comm", "-r"]),
            layout: ps_columns(MetricUnit::Percent),
        },
        PS_AUX_CPU,
        ProcessMethod {
            command: CommandSpec::new("top", &["-b", "-o", "cpu", "20"]),
            layout: TOP_WCPU,
        },
    ],
    memory_processes: &[
        ProcessMethod {
            command: CommandSpec::new("ps", &["-axo", "pid,rss,comm", "-m"]),
            layout: ps_columns(MetricUnit::Kibibytes),
        },
        PS_AUX_MEMORY,
        ProcessMethod {
            command: CommandSpec::new("top", &["-b", "-o", "res", "20"]),
            layout: TOP_RES,
        },
    ],
    os_release: Some("/etc/os-release"),
    release_files: &[],
    os_command: None,
};

// PID USERNAME THR PRI NICE SIZE RES STATE C TIME WCPU COMMAND
const TOP_WCPU: ProcessLayout = ProcessLayout {
    pid_col: 0,
    metric_col: 10,
    command_col: 11,
    command_is_argv: false,
    unit: MetricUnit::Percent,
};

const TOP_RES: ProcessLayout = ProcessLayout {
    pid_col: 0,
    metric_col: 6,
    command_col: 11,
    command_is_argv: false,
    unit: MetricUnit::SizeWithSuffix,
};

fn top_sampler(period: Duration) -> Source {
    Source::command("top", &["-b", "-d", "2", "-s"])
        .with_arg(whole_seconds(period))
        .with_grace(period)
}
