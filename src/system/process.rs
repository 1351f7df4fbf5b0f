use serde::Serialize;
use tracing::debug;

use super::chain::{Candidate, ParseError, first_success};
use super::platform::{MetricUnit, ProcessLayout, Strategy};
use super::source::SourceReader;
use crate::format::{parse_validated, parse_validated_u64, truncate_name};

pub const MAX_ENTRIES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RankBy {
    Cpu,
    Memory,
}

impl RankBy {
    pub fn metric_name(self) -> &'static str {
        match self {
            RankBy::Cpu => "cpu processes",
            RankBy::Memory => "memory processes",
        }
    }
}

/// One ranked process. `metric` is a CPU percentage or resident memory in MB.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    pub metric: f64,
}

/// Program name without its directory, for absolute or `./` paths only.
///
/// Kernel thread names such as `kworker/0:1` are left alone.
pub fn base_name(command: &str) -> &str {
    if command.starts_with('/') || command.starts_with("./") {
        command.rsplit('/').find(|part| !part.is_empty()).unwrap_or(command)
    } else {
        command
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Converts a `top` size such as `512M`, `1.2g`, `2048K+` or `300` (KiB) to MB.
pub fn size_to_mb(field: &str) -> Option<f64> {
    let field = field.trim_end_matches(['+', '-']);
    let (number, suffix) = match field.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&field[..idx], Some(c.to_ascii_uppercase())),
        _ => (field, None),
    };
    let value = parse_validated(number)?;
    let mb = match suffix {
        None | Some('K') => value / 1024.0,
        Some('M') => value,
        Some('G') => value * 1024.0,
        Some('T') => value * 1024.0 * 1024.0,
        Some('B') => value / (1024.0 * 1024.0),
        Some(_) => return None,
    };
    Some(round_tenth(mb))
}

pub fn parse_metric(field: &str, unit: MetricUnit) -> Option<f64> {
    match unit {
        MetricUnit::Percent => parse_validated(field.strip_suffix('%').unwrap_or(field)),
        MetricUnit::Kibibytes => parse_validated(field).map(|kib| round_tenth(kib / 1024.0)),
        MetricUnit::SizeWithSuffix => size_to_mb(field),
    }
}

fn parse_row(line: &str, layout: &ProcessLayout) -> Option<ProcessEntry> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let needed = layout.pid_col.max(layout.metric_col).max(layout.command_col) + 1;
    if fields.len() < needed {
        return None;
    }

    let pid = parse_validated_u64(fields[layout.pid_col])
        .filter(|&pid| pid > 0)
        .and_then(|pid| u32::try_from(pid).ok())?;
    let metric = parse_metric(fields[layout.metric_col], layout.unit)?;

    let command = if layout.command_is_argv {
        fields[layout.command_col].to_string()
    } else {
        fields[layout.command_col..].join(" ")
    };

    Some(ProcessEntry {
        pid,
        name: truncate_name(base_name(&command)),
        metric,
    })
}

/// Parses a process listing into at most [`MAX_ENTRIES`] rows, highest metric first.
///
/// Rows start after the line holding a `PID` column title when there is one,
/// which skips `top`'s summary block. Rows with an invalid PID or metric are
/// dropped; ties keep the listing's order.
pub fn parse_rows(raw: &str, layout: &ProcessLayout) -> Vec<ProcessEntry> {
    let lines: Vec<&str> = raw.lines().collect();
    let start = lines
        .iter()
        .position(|line| line.split_whitespace().any(|token| token == "PID"))
        .map_or(0, |header| header + 1);

    let mut rows: Vec<ProcessEntry> = lines[start..]
        .iter()
        .filter_map(|line| {
            let row = parse_row(line, layout);
            if row.is_none() && !line.trim().is_empty() {
                debug!(line, "skipping process row");
            }
            row
        })
        .collect();
    rows.sort_by(|a, b| b.metric.total_cmp(&a.metric));
    rows.truncate(MAX_ENTRIES);
    rows
}

pub async fn collect<R: SourceReader>(
    reader: &R,
    strategy: &Strategy,
    rank: RankBy,
) -> Vec<ProcessEntry> {
    let methods = match rank {
        RankBy::Cpu => strategy.cpu_processes,
        RankBy::Memory => strategy.memory_processes,
    };
    let candidates = methods
        .iter()
        .map(|method| {
            let layout = method.layout;
            Candidate::new(method.command.source(), move |raw: &str| {
                let rows = parse_rows(raw, &layout);
                if rows.is_empty() {
                    Err(ParseError::Missing("valid process row"))
                } else {
                    Ok(rows)
                }
            })
        })
        .collect();
    first_success(reader, rank.metric_name(), candidates)
        .await
        .unwrap_or_default()
}
