use std::path::Path;

use serde::Serialize;
use tracing::debug;

use super::chain::{Candidate, ParseError, first_line, first_success};
use super::platform::{ReleaseFile, Strategy};
use super::source::{NativeProbe, PathStatus, Source, SourceReader};
use crate::format::{
    format_decimal, format_duration_label, parse_validated, parse_validated_u64,
};

pub const MAX_LISTED_USERS: usize = 5;

const AUTH_LOGS: [&str; 2] = ["/var/log/auth.log", "/var/log/secure"];
const FAILED_LOGIN_MARKER: &str = "Failed password";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

impl LoadAverage {
    pub fn label(&self) -> String {
        format!(
            "{}, {}, {}",
            format_decimal(self.one),
            format_decimal(self.five),
            format_decimal(self.fifteen)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemInfo {
    pub hostname: Option<String>,
    pub os_label: Option<String>,
    pub kernel: Option<String>,
    pub uptime_seconds: Option<u64>,
    pub load_average: Option<LoadAverage>,
}

impl SystemInfo {
    pub fn uptime_label(&self) -> Option<String> {
        self.uptime_seconds.map(format_duration_label)
    }

    pub fn load_average_label(&self) -> Option<String> {
        self.load_average.as_ref().map(LoadAverage::label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub user_count: usize,
    /// First distinct names in listing order, at most [`MAX_LISTED_USERS`].
    pub user_names: Vec<String>,
    pub overflow_count: usize,
}

impl UserInfo {
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut distinct: Vec<String> = Vec::new();
        for name in names {
            if !distinct.iter().any(|seen| seen == name) {
                distinct.push(name.to_string());
            }
        }
        let user_count = distinct.len();
        distinct.truncate(MAX_LISTED_USERS);
        Self {
            user_count,
            overflow_count: user_count - distinct.len(),
            user_names: distinct,
        }
    }
}

/// Failed-login tally. A log that exists but cannot be read is reported
/// separately from a host with no log at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedLogins {
    Count(u64),
    PermissionDenied,
    Unavailable,
}

pub fn parse_hostname(raw: &str) -> Result<String, ParseError> {
    let line = first_line(raw)?;
    line.split_whitespace()
        .next()
        .map(str::to_string)
        .ok_or(ParseError::Missing("host name"))
}

pub fn parse_single_line(raw: &str) -> Result<String, ParseError> {
    first_line(raw).map(str::to_string)
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches(|c| c == '"' || c == '\'')
}

/// `PRETTY_NAME`, else `NAME VERSION_ID`, from an os-release file.
pub fn parse_os_release(raw: &str) -> Result<String, ParseError> {
    let value_of = |key: &str| {
        raw.lines()
            .filter_map(|line| line.split_once('='))
            .find(|(k, _)| k.trim() == key)
            .map(|(_, v)| unquote(v))
            .filter(|v| !v.is_empty())
    };
    if let Some(pretty) = value_of("PRETTY_NAME") {
        return Ok(pretty.to_string());
    }
    let name = value_of("NAME").ok_or(ParseError::Missing("NAME or PRETTY_NAME"))?;
    Ok(match value_of("VERSION_ID") {
        Some(version) => format!("{name} {version}"),
        None => name.to_string(),
    })
}

pub fn parse_release_file(raw: &str, prefix: Option<&str>) -> Result<String, ParseError> {
    let line = first_line(raw)?;
    Ok(match prefix {
        Some(prefix) => format!("{prefix} {line}"),
        None => line.to_string(),
    })
}

pub fn parse_sw_vers(raw: &str) -> Result<String, ParseError> {
    let value_of = |key: &str| {
        raw.lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(k, _)| k.trim() == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    };
    let name = value_of("ProductName").ok_or(ParseError::Missing("ProductName"))?;
    Ok(match value_of("ProductVersion") {
        Some(version) => format!("{name} {version}"),
        None => name.to_string(),
    })
}

pub fn parse_uptime_seconds(raw: &str) -> Result<u64, ParseError> {
    let field = first_line(raw)?
        .split_whitespace()
        .next()
        .ok_or(ParseError::Missing("uptime seconds"))?;
    parse_validated(field)
        .map(|secs| secs as u64)
        .ok_or_else(|| ParseError::invalid("uptime seconds", field))
}

fn unit_seconds(unit: &str) -> Option<u64> {
    let unit = unit.trim_end_matches(',').to_ascii_lowercase();
    match unit.trim_end_matches('s') {
        "week" => Some(604_800),
        "day" => Some(86_400),
        "hour" | "hr" => Some(3_600),
        "minute" | "min" => Some(60),
        "second" | "sec" => Some(1),
        _ => None,
    }
}

fn add_scaled(acc: u64, count: u64, unit: u64) -> Option<u64> {
    count.checked_mul(unit).and_then(|secs| acc.checked_add(secs))
}

/// Parses the `up ...` part of `uptime -p` or plain `uptime`.
///
/// Handles `up 2 weeks, 3 days, 4 hours, 5 minutes`, `up 3 days,  4:05,`
/// and `up 12 min,`. Parsing stops at the user count or load average.
pub fn parse_uptime_report(raw: &str) -> Result<u64, ParseError> {
    let line = first_line(raw)?;
    let after_up = line
        .strip_prefix("up ")
        .or_else(|| line.split_once(" up ").map(|(_, rest)| rest))
        .ok_or(ParseError::Missing("\"up\" marker"))?;

    let mut seconds = 0u64;
    let mut matched = false;
    for segment in after_up.split(',').map(str::trim) {
        if segment.contains("user") || segment.contains("load") {
            break;
        }
        if let Some((hours, minutes)) = segment.split_once(':') {
            let h = parse_validated_u64(hours)
                .ok_or_else(|| ParseError::invalid("uptime hours", hours))?;
            let m = parse_validated_u64(minutes)
                .ok_or_else(|| ParseError::invalid("uptime minutes", minutes))?;
            seconds = add_scaled(seconds, h, 3_600)
                .and_then(|total| add_scaled(total, m, 60))
                .ok_or_else(|| ParseError::invalid("uptime duration", segment))?;
            matched = true;
            continue;
        }
        let mut words = segment.split_whitespace();
        while let (Some(count), Some(unit)) = (words.next(), words.next()) {
            let n = parse_validated_u64(count)
                .ok_or_else(|| ParseError::invalid("uptime count", count))?;
            let unit = unit_seconds(unit)
                .ok_or_else(|| ParseError::invalid("uptime unit", unit))?;
            seconds = add_scaled(seconds, n, unit)
                .ok_or_else(|| ParseError::invalid("uptime duration", segment))?;
            matched = true;
        }
    }
    if matched {
        Ok(seconds)
    } else {
        Err(ParseError::Missing("uptime duration"))
    }
}

fn load_triple<'a>(tokens: impl Iterator<Item = &'a str>) -> Result<LoadAverage, ParseError> {
    let values: Vec<&str> = tokens
        .flat_map(|token| token.split(','))
        .map(|token| token.trim_matches(|c| c == '{' || c == '}'))
        .filter(|token| !token.is_empty())
        .take(3)
        .collect();
    if values.len() < 3 {
        return Err(ParseError::FieldCount {
            expected: 3,
            found: values.len(),
        });
    }
    let number = |value: &str| {
        parse_validated(value).ok_or_else(|| ParseError::invalid("load average", value))
    };
    Ok(LoadAverage {
        one: number(values[0])?,
        five: number(values[1])?,
        fifteen: number(values[2])?,
    })
}

pub fn parse_load_fields(raw: &str) -> Result<LoadAverage, ParseError> {
    load_triple(first_line(raw)?.split_whitespace())
}

/// The `load average:` (or `load averages:`) tail of `uptime`.
pub fn parse_uptime_load(raw: &str) -> Result<LoadAverage, ParseError> {
    let line = first_line(raw)?;
    let (_, tail) = line
        .split_once("load average")
        .ok_or(ParseError::Missing("load average"))?;
    let (_, values) = tail.split_once(':').ok_or(ParseError::Missing("load average values"))?;
    load_triple(values.split_whitespace())
}

pub fn parse_who(raw: &str) -> Result<UserInfo, ParseError> {
    let names: Vec<&str> = raw
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    if names.is_empty() {
        return Err(ParseError::Missing("login session"));
    }
    Ok(UserInfo::from_names(names))
}

/// `who -q`: names on the first lines, then `# users=N`. Resolves to zero users too.
pub fn parse_who_quick(raw: &str) -> Result<UserInfo, ParseError> {
    if !raw.lines().any(|line| line.trim_start().starts_with("# users=")) {
        return Err(ParseError::Missing("# users= trailer"));
    }
    Ok(UserInfo::from_names(
        raw.lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .flat_map(str::split_whitespace),
    ))
}

pub fn parse_users(raw: &str) -> Result<UserInfo, ParseError> {
    Ok(UserInfo::from_names(first_line(raw)?.split_whitespace()))
}

pub fn parse_lastb(raw: &str) -> Result<u64, ParseError> {
    if !raw.contains("btmp begins") {
        return Err(ParseError::Missing("btmp trailer"));
    }
    Ok(raw
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with("btmp begins"))
        .count() as u64)
}

pub fn count_failed_passwords(raw: &str) -> Result<u64, ParseError> {
    Ok(raw.lines().filter(|line| line.contains(FAILED_LOGIN_MARKER)).count() as u64)
}

async fn os_label<R: SourceReader>(reader: &R, strategy: &Strategy) -> Option<String> {
    let mut candidates = Vec::new();
    if let Some(path) = strategy.os_release {
        candidates.push(Candidate::new(Source::file(path), parse_os_release));
    }
    for &ReleaseFile { path, prefix } in strategy.release_files {
        candidates.push(Candidate::new(Source::file(path), move |raw: &str| {
            parse_release_file(raw, prefix)
        }));
    }
    if let Some(command) = strategy.os_command {
        candidates.push(Candidate::new(command.source(), parse_sw_vers));
    }
    candidates.push(Candidate::new(
        Source::command("uname", &["-sr"]),
        parse_single_line,
    ));
    candidates.push(Candidate::new(
        Source::Native(NativeProbe::OsLabel),
        parse_single_line,
    ));
    first_success(reader, "os label", candidates).await
}

async fn hostname<R: SourceReader>(reader: &R) -> Option<String> {
    let candidates = vec![
        Candidate::new(Source::file("/etc/hostname"), parse_hostname),
        Candidate::new(Source::command("hostname", &[]), parse_hostname),
        Candidate::new(Source::Native(NativeProbe::HostName), parse_hostname),
    ];
    first_success(reader, "hostname", candidates).await
}

async fn kernel<R: SourceReader>(reader: &R) -> Option<String> {
    let candidates = vec![
        Candidate::new(Source::file("/proc/sys/kernel/osrelease"), parse_single_line),
        Candidate::new(Source::command("uname", &["-r"]), parse_single_line),
    ];
    first_success(reader, "kernel", candidates).await
}

async fn uptime<R: SourceReader>(reader: &R) -> Option<u64> {
    let candidates = vec![
        Candidate::new(Source::file("/proc/uptime"), parse_uptime_seconds),
        Candidate::new(Source::command("uptime", &["-p"]), parse_uptime_report),
        Candidate::new(Source::command("uptime", &[]), parse_uptime_report),
        Candidate::new(Source::Native(NativeProbe::Uptime), parse_uptime_seconds),
    ];
    first_success(reader, "uptime", candidates).await
}

async fn load_average<R: SourceReader>(reader: &R) -> Option<LoadAverage> {
    let candidates = vec![
        Candidate::new(Source::file("/proc/loadavg"), parse_load_fields),
        Candidate::new(Source::command("sysctl", &["-n", "vm.loadavg"]), parse_load_fields),
        Candidate::new(Source::command("uptime", &[]), parse_uptime_load),
        Candidate::new(Source::Native(NativeProbe::LoadAverage), parse_load_fields),
    ];
    first_success(reader, "load average", candidates).await
}

pub async fn collect_system<R: SourceReader>(reader: &R, strategy: &Strategy) -> SystemInfo {
    SystemInfo {
        hostname: hostname(reader).await,
        os_label: os_label(reader, strategy).await,
        kernel: kernel(reader).await,
        uptime_seconds: uptime(reader).await,
        load_average: load_average(reader).await,
    }
}

pub async fn collect_users<R: SourceReader>(reader: &R) -> Option<UserInfo> {
    let candidates = vec![
        Candidate::new(Source::command("who", &[]), parse_who),
        Candidate::new(Source::command("who", &["-q"]), parse_who_quick),
        Candidate::new(Source::command("users", &[]), parse_users),
    ];
    first_success(reader, "users", candidates).await
}

pub async fn collect_failed_logins<R: SourceReader>(reader: &R) -> FailedLogins {
    let mut candidates = vec![Candidate::new(Source::command("lastb", &[]), parse_lastb)];
    candidates.extend(
        AUTH_LOGS
            .iter()
            .map(|&path| Candidate::new(Source::file(path), count_failed_passwords)),
    );
    if let Some(count) = first_success(reader, "failed logins", candidates).await {
        return FailedLogins::Count(count);
    }

    let denied = AUTH_LOGS
        .iter()
        .any(|&path| reader.probe(Path::new(path)) == PathStatus::Unreadable);
    if denied {
        debug!("authentication log present but unreadable");
        FailedLogins::PermissionDenied
    } else {
        FailedLogins::Unavailable
    }
}
