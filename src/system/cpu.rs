use std::time::Duration;

use tracing::debug;

use super::chain::{Candidate, ParseError, first_line, first_success};
use super::platform::Strategy;
use super::source::{Source, SourceReader};
use crate::format::{parse_validated, parse_validated_u64};

const MIN_COUNTER_FIELDS: usize = 4;
const IDLE: usize = 3;
const IOWAIT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuSnapshot {
    pub total: u64,
    pub idle: u64,
}

/// Parses the first non-blank line: `cpu user nice system idle [iowait irq softirq steal ...]`.
///
/// `total` sums every field present; `idle` is idle + iowait.
pub fn parse_counters(raw: &str) -> Result<CpuSnapshot, ParseError> {
    let line = first_line(raw)?;
    let values: Vec<&str> = line.split_whitespace().skip(1).collect();
    if values.len() < MIN_COUNTER_FIELDS {
        return Err(ParseError::FieldCount {
            expected: MIN_COUNTER_FIELDS,
            found: values.len(),
        });
    }

    let mut ticks = Vec::with_capacity(values.len());
    for value in &values {
        let tick =
            parse_validated_u64(value).ok_or_else(|| ParseError::invalid("cpu ticks", value))?;
        ticks.push(tick);
    }

    let total = ticks.iter().fold(0u64, |acc, t| acc.saturating_add(*t));
    let idle = ticks[IDLE].saturating_add(ticks.get(IOWAIT).copied().unwrap_or(0));
    Ok(CpuSnapshot { total, idle })
}

/// `(Δtotal − Δidle) × 100 / Δtotal`, clamped to `[0, 100]`; `None` when no ticks elapsed.
pub fn usage_from_deltas(delta_total: u64, delta_idle: u64) -> Option<f64> {
    if delta_total == 0 {
        return None;
    }
    let busy = delta_total.saturating_sub(delta_idle) as f64;
    Some((busy * 100.0 / delta_total as f64).clamp(0.0, 100.0))
}

pub fn usage_between(before: CpuSnapshot, after: CpuSnapshot) -> Option<f64> {
    usage_from_deltas(
        after.total.saturating_sub(before.total),
        after.idle.saturating_sub(before.idle),
    )
}

/// Parses the last CPU summary line of a `top` run.
///
/// Recognised shapes:
/// - procps: `%Cpu(s):  3.1 us,  1.0 sy,  0.0 ni, 95.2 id, ...`
/// - older procps: `Cpu(s):  3.1%us,  1.0%sy, ..., 95.2%id, ...`
/// - macOS: `CPU usage: 3.33% user, 5.0% sys, 91.66% idle`
/// - BSD: `CPU:  0.4% user,  0.0% nice,  0.4% system,  0.0% interrupt, 99.2% idle`
///
/// `100 − idle` when idle is reported, otherwise `user + system`.
pub fn parse_top_summary(raw: &str) -> Result<f64, ParseError> {
    // The first iteration of a batch run reports averages since boot.
    let line = raw
        .lines()
        .rev()
        .find(|line| {
            let lower = line.trim_start().to_ascii_lowercase();
            (lower.starts_with("%cpu") || lower.starts_with("cpu")) && line.contains(':')
        })
        .ok_or(ParseError::Missing("cpu summary line"))?;

    let (_, fields) = line.split_once(':').ok_or(ParseError::Missing("cpu summary fields"))?;
    let mut user = None;
    let mut system = None;
    let mut idle = None;

    for field in fields.split(',') {
        let field = field.trim();
        let number_len = field
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(field.len());
        let (number, label) = field.split_at(number_len);
        let label = label.trim_start_matches('%').trim();
        let slot = match label {
            "us" | "user" => &mut user,
            "sy" | "sys" | "system" => &mut system,
            "id" | "idle" => &mut idle,
            _ => continue,
        };
        let percent =
            parse_validated(number).ok_or_else(|| ParseError::invalid("cpu percent", number))?;
        *slot = Some(percent);
    }

    let usage = match (idle, user, system) {
        (Some(idle), _, _) => 100.0 - idle,
        (None, Some(user), Some(system)) => user + system,
        _ => return Err(ParseError::Missing("user/system/idle triple")),
    };
    Ok(usage.clamp(0.0, 100.0))
}

enum Sampled {
    Usage(f64),
    /// Both reads parsed but the counters did not move.
    NoTicks,
    /// The counter source could not be read or parsed; try the fallback.
    SourceFailed,
}

async fn read_counters<R: SourceReader>(reader: &R, source: &Source) -> Option<CpuSnapshot> {
    let raw = match reader.read(source).await {
        Ok(raw) => raw,
        Err(err) => {
            debug!(%source, error = %err, "cpu counters unavailable");
            return None;
        }
    };
    match parse_counters(&raw) {
        Ok(snapshot) => Some(snapshot),
        Err(err) => {
            debug!(%source, error = %err, "cpu counters rejected");
            None
        }
    }
}

async fn sample_counters<R: SourceReader>(
    reader: &R,
    source: &Source,
    period: Duration,
) -> Sampled {
    let Some(before) = read_counters(reader, source).await else {
        return Sampled::SourceFailed;
    };
    tokio::time::sleep(period).await;
    let Some(after) = read_counters(reader, source).await else {
        return Sampled::SourceFailed;
    };

    match usage_between(before, after) {
        Some(usage) => Sampled::Usage(usage),
        None => Sampled::NoTicks,
    }
}

/// Overall CPU usage in percent over one sampling period.
///
/// A readable counter source that shows no elapsed ticks yields `None`
/// directly; only an unreadable or malformed one moves on to `top`.
pub async fn collect<R: SourceReader>(
    reader: &R,
    strategy: &Strategy,
    period: Duration,
) -> Option<f64> {
    if let Some(path) = strategy.cpu_counters {
        match sample_counters(reader, &Source::file(path), period).await {
            Sampled::Usage(usage) => return Some(usage),
            Sampled::NoTicks => {
                debug!("no ticks elapsed between samples");
                return None;
            }
            Sampled::SourceFailed => debug!("falling back to sampling utility"),
        }
    }

    let candidates = strategy
        .cpu_sampler
        .map(|sampler| vec![Candidate::new(sampler(period), parse_top_summary)])
        .unwrap_or_default();
    first_success(reader, "cpu", candidates).await
}
