use std::time::Duration;

use super::{
    CommandSpec, MetricUnit, PS_AUX_CPU, PS_AUX_MEMORY, ProcessMethod, Strategy, ps_columns,
    whole_seconds,
};
use crate::system::source::Source;

pub(super) static STRATEGY: Strategy = Strategy {
    cpu_counters: None,
    cpu_sampler: Some(top_sampler),
    cpu_processes: &[
        ProcessMethod {
            command: CommandSpec::new("ps", &["-Ao", "pid,pcpu,comm", "-r"]),
            layout: ps_columns(MetricUnit::Percent),
        },
        PS_AUX_CPU,
        ProcessMethod {
            command: CommandSpec::new(
                "top",
                &["-l", "1", "-o", "cpu", "-n", "20", "-stats", "pid,cpu,command"],
            ),
            layout: ps_columns(MetricUnit::Percent),
        },
    ],
    memory_processes: &[
        ProcessMethod {
            command: CommandSpec::new("ps", &["-Ao", "pid,rss,comm", "-m"]),
            layout: ps_columns(MetricUnit::Kibibytes),
        },
        PS_AUX_MEMORY,
        ProcessMethod {
            command: CommandSpec::new(
                "top",
                &["-l", "1", "-o", "mem", "-n", "20", "-stats", "pid,mem,command"],
            ),
            layout: ps_columns(MetricUnit::SizeWithSuffix),
        },
    ],
    os_release: None,
    release_files: &[],
    os_command: Some(CommandSpec::new("sw_vers", &[])),
};

fn top_sampler(period: Duration) -> Source {
    Source::command("top", &["-l", "2", "-n", "0", "-s"])
        .with_arg(whole_seconds(period))
        .with_grace(period)
}
