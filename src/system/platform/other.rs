use super::{
    CommandSpec, MetricUnit, PS_AUX_CPU, PS_AUX_MEMORY, ProcessMethod, Strategy, ps_columns,
};

// Plain POSIX `ps -o` without sort flags; rows are ranked after parsing.
pub(super) static STRATEGY: Strategy = Strategy {
    cpu_counters: None,
    cpu_sampler: None,
    cpu_processes: &[
        ProcessMethod {
            command: CommandSpec::new("ps", &["-eo", "pid,pcpu,comm"]),
            layout: ps_columns(MetricUnit::Percent),
        },
        PS_AUX_CPU,
    ],
    memory_processes: &[
        ProcessMethod {
            command: CommandSpec::new("ps", &["-eo", "pid,rss,comm"]),
            layout: ps_columns(MetricUnit::Kibibytes),
        },
        PS_AUX_MEMORY,
    ],
    os_release: Some("/etc/os-release"),
    release_files: &[],
    os_command: None,
};
