use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use super::chain::{Candidate, ParseError, first_success};
use super::source::{PathStatus, Source, SourceReader};
use crate::format::{is_numeric, parse_validated, parse_validated_u64};

pub const POSIX_BLOCK_SIZE: u64 = 512;
pub const KIB_BLOCK_SIZE: u64 = 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskUsage {
    pub filesystem: Option<String>,
    pub mount_point: Option<String>,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub used_percent: f64,
}

impl DiskUsage {
    pub fn unaccounted_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        let accounted = self.used_bytes.saturating_add(self.available_bytes);
        self.total_bytes.abs_diff(accounted) as f64 * 100.0 / self.total_bytes as f64
    }
}

/// Block size declared by a header column such as `1024-blocks`, `1K-blocks` or `512-blocks`.
pub fn declared_block_size(header: &str) -> Option<u64> {
    let column = header.split_whitespace().find_map(|col| col.strip_suffix("-blocks"))?;
    let (digits, scale) = match column.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => column.split_at(idx),
        None => (column, ""),
    };
    let count = parse_validated_u64(digits)?;
    let scale = match scale {
        "" | "B" => 1,
        "K" | "k" => 1024,
        "M" => 1024 * 1024,
        "G" => 1024 * 1024 * 1024,
        _ => return None,
    };
    count.checked_mul(scale)
}

/// Parses one data line: `[filesystem] total used available [capacity%] [mount...]`.
///
/// When a long filesystem name was wrapped onto its own line the data line
/// starts with the numeric total and every field shifts left by one.
pub fn parse_df_line(line: &str, block_size: u64) -> Result<DiskUsage, ParseError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let wrapped = fields.first().is_some_and(|first| is_numeric(first));
    let offset = usize::from(!wrapped);
    if fields.len() < offset + 3 {
        return Err(ParseError::FieldCount {
            expected: offset + 3,
            found: fields.len(),
        });
    }

    let blocks = |idx: usize, name: &'static str| {
        parse_validated_u64(fields[idx]).ok_or_else(|| ParseError::invalid(name, fields[idx]))
    };
    let total = blocks(offset, "total blocks")?;
    let used = blocks(offset + 1, "used blocks")?;
    let available = blocks(offset + 2, "available blocks")?;

    let reported = fields
        .get(offset + 3)
        .and_then(|pct| pct.strip_suffix('%'))
        .and_then(parse_validated);
    let used_percent = match reported {
        Some(pct) => pct,
        None => {
            debug!(line, "recomputing capacity from block counts");
            if total == 0 {
                0.0
            } else {
                used as f64 * 100.0 / total as f64
            }
        }
    };

    let mount_point = fields
        .get(offset + 4..)
        .filter(|rest| !rest.is_empty())
        .map(|rest| rest.join(" "));

    Ok(DiskUsage {
        filesystem: (!wrapped).then(|| fields[0].to_string()),
        mount_point,
        total_bytes: total.saturating_mul(block_size),
        used_bytes: used.saturating_mul(block_size),
        available_bytes: available.saturating_mul(block_size),
        used_percent,
    })
}

pub fn parse_df(raw: &str, default_block_size: u64) -> Result<DiskUsage, ParseError> {
    let mut lines = raw.lines().filter(|line| !line.trim().is_empty()).peekable();
    let mut block_size = default_block_size;
    if let Some(header) = lines.next_if(|line| line.starts_with("Filesystem")) {
        block_size = declared_block_size(header).unwrap_or(default_block_size);
    }

    let first = lines.next().ok_or(ParseError::Missing("df data line"))?;
    let mut tokens = first.split_whitespace();
    if let (Some(name), None) = (tokens.next(), tokens.next()) {
        let continuation = lines.next().ok_or(ParseError::Missing("wrapped df data line"))?;
        let mut usage = parse_df_line(continuation, block_size)?;
        usage.filesystem = Some(name.to_string());
        return Ok(usage);
    }
    parse_df_line(first, block_size)
}

async fn precheck<R: SourceReader>(reader: &R, path: &Path) -> bool {
    match reader.probe(path) {
        PathStatus::Readable => {}
        status => {
            debug!(path = %path.display(), ?status, "disk target not accessible");
            return false;
        }
    }
    let mounted = Source::command("df", &[]).with_arg(path.display().to_string());
    match reader.read(&mounted).await {
        Ok(_) => true,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "disk target not reported by df");
            false
        }
    }
}

pub async fn collect<R: SourceReader>(
    reader: &R,
    path: &Path,
    reserved_tolerance_percent: f64,
) -> Option<DiskUsage> {
    if !precheck(reader, path).await {
        return None;
    }

    let target = path.display().to_string();
    let df = |flags: &[&str]| Source::command("df", flags).with_arg(target.clone());
    let candidates = vec![
        Candidate::new(df(&["-P"]), |raw: &str| parse_df(raw, POSIX_BLOCK_SIZE)),
        Candidate::new(df(&["-k"]), |raw: &str| parse_df(raw, KIB_BLOCK_SIZE)),
        Candidate::new(df(&[]), |raw: &str| parse_df(raw, KIB_BLOCK_SIZE)),
    ];
    let usage = first_success(reader, "disk", candidates).await?;

    let gap = usage.unaccounted_percent();
    if gap > reserved_tolerance_percent {
        warn!(
            path = %target,
            gap_percent = gap,
            tolerance_percent = reserved_tolerance_percent,
            "used + available differs from total by more than reserved-block tolerance"
        );
    }
    Some(usage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::mock::MockSource;

    #[test]
    fn kilobyte_line_converts_to_bytes() {
        let usage = parse_df_line("/dev/sda1 20971520 13631488 6291712 69% /", 1024).unwrap();
        assert_eq!(usage.total_bytes, 20_971_520 * 1024);
        assert_eq!(usage.used_bytes, 13_631_488 * 1024);
        assert_eq!(usage.available_bytes, 6_291_712 * 1024);
        assert_eq!(usage.used_percent, 69.0);
        assert_eq!(usage.filesystem.as_deref(), Some("/dev/sda1"));
        assert_eq!(usage.mount_point.as_deref(), Some("/"));
    }

    #[test]
    fn two_field_line_fails() {
        assert!(matches!(
            parse_df_line("/dev/sda1 20971520", 1024),
            Err(ParseError::FieldCount { .. })
        ));
        assert!(matches!(
            parse_df_line("20971520 13631488", 1024),
            Err(ParseError::FieldCount { .. })
        ));
    }

    #[test]
    fn wrapped_line_starts_with_total() {
        let usage = parse_df_line("  1000 250 750 25% /srv", 512).unwrap();
        assert_eq!(usage.filesystem, None);
        assert_eq!(usage.total_bytes, 512_000);
        assert_eq!(usage.mount_point.as_deref(), Some("/srv"));
    }

    #[test]
    fn missing_or_invalid_capacity_is_recomputed() {
        let usage = parse_df_line("/dev/sdb1 1000 250 750", 1024).unwrap();
        assert_eq!(usage.used_percent, 25.0);
        let usage = parse_df_line("/dev/sdb1 1000 500 500 -% /", 1024).unwrap();
        assert_eq!(usage.used_percent, 50.0);
        let usage = parse_df_line("/dev/sdb1 0 0 0 - /", 1024).unwrap();
        assert_eq!(usage.used_percent, 0.0);
    }

    #[test]
    fn non_numeric_blocks_fail() {
        assert!(matches!(
            parse_df_line("/dev/sdb1 lots 250 750 25% /", 1024),
            Err(ParseError::Invalid { .. })
        ));
    }

    #[test]
    fn header_declares_block_size() {
        let posix = "Filesystem 512-blocks Used Available Capacity Mounted on";
        assert_eq!(declared_block_size(posix), Some(512));
        let kib = "Filesystem 1024-blocks Used Available Capacity Mounted on";
        assert_eq!(declared_block_size(kib), Some(1024));
        let gnu = "Filesystem 1K-blocks Used Available Use% Mounted on";
        assert_eq!(declared_block_size(gnu), Some(1024));
        let human = "Filesystem Size Used Avail Use% Mounted on";
        assert_eq!(declared_block_size(human), None);
    }

    #[test]
    fn oversized_header_block_size_is_ignored() {
        let header = "Filesystem 18446744073709551615K-blocks Used Available Capacity Mounted on";
        assert_eq!(declared_block_size(header), None);

        let raw = format!("{header}\n/dev/sda1 2000 1000 1000 50% /\n");
        let usage = parse_df(&raw, POSIX_BLOCK_SIZE).unwrap();
        assert_eq!(usage.total_bytes, 2000 * 512);
    }

    #[test]
    fn report_uses_header_block_size() {
        let raw = "Filesystem     1024-blocks     Used Available Capacity Mounted on\n\
                   /dev/sda1         20971520 13631488   6291712      69% /\n";
        let usage = parse_df(raw, POSIX_BLOCK_SIZE).unwrap();
        assert_eq!(usage.total_bytes, 20_971_520 * 1024);
    }

    #[test]
    fn report_without_declared_size_uses_default() {
        let raw = "Filesystem Size Used Avail Use% Mounted on\n/dev/sda1 100 50 50 50% /\n";
        assert_eq!(parse_df(raw, 1024).unwrap().total_bytes, 102_400);
    }

    #[test]
    fn wrapped_report_keeps_filesystem_name() {
        let raw = "Filesystem 512-blocks Used Available Capacity Mounted on\n\
                   /dev/mapper/vg_very_long_volume_group-lv_root\n\
                   \x20                 2000 500 1500 25% /\n";
        let usage = parse_df(raw, POSIX_BLOCK_SIZE).unwrap();
        assert_eq!(
            usage.filesystem.as_deref(),
            Some("/dev/mapper/vg_very_long_volume_group-lv_root")
        );
        assert_eq!(usage.total_bytes, 2000 * 512);
        assert_eq!(usage.used_percent, 25.0);
    }

    #[test]
    fn header_only_report_fails() {
        assert_eq!(
            parse_df("Filesystem 1K-blocks Used Available Use% Mounted on\n", 1024),
            Err(ParseError::Missing("df data line"))
        );
    }

    #[test]
    fn unaccounted_space() {
        let usage = parse_df_line("/dev/sda1 1000 500 380 57% /", 1).unwrap();
        assert!((usage.unaccounted_percent() - 12.0).abs() < 1e-9);
    }

    fn mounted_root() -> MockSource {
        let mut fs = MockSource::new();
        fs.add_dir("/");
        fs.add_command(
            "df /",
            "Filesystem 1K-blocks Used Available Use% Mounted on\n/dev/sda1 1000 500 500 50% /\n",
        );
        fs
    }

    #[tokio::test]
    async fn posix_report_is_preferred() {
        let mut fs = mounted_root();
        fs.add_command(
            "df -P /",
            "Filesystem 512-blocks Used Available Capacity Mounted on\n/dev/sda1 2000 1000 1000 50% /\n",
        );
        let usage = collect(&fs, Path::new("/"), 10.0).await.unwrap();
        assert_eq!(usage.total_bytes, 2000 * 512);
        assert_eq!(fs.read_count("df -k /"), 0);
    }

    #[tokio::test]
    async fn falls_back_to_default_report() {
        let fs = mounted_root();
        let usage = collect(&fs, Path::new("/"), 10.0).await.unwrap();
        assert_eq!(usage.total_bytes, 1000 * 1024);
        assert_eq!(fs.read_count("df -P /"), 1);
        assert_eq!(fs.read_count("df -k /"), 1);
    }

    #[tokio::test]
    async fn inaccessible_path_short_circuits() {
        let mut fs = mounted_root();
        fs.add_command(
            "df -P /data",
            "Filesystem 512-blocks Used Available Capacity Mounted on\n/dev/sdb1 10 5 5 50% /data\n",
        );
        assert_eq!(collect(&fs, Path::new("/data"), 10.0).await, None);
        assert_eq!(fs.read_count("df -P /data"), 0);
    }

    #[tokio::test]
    async fn unmounted_path_short_circuits() {
        let mut fs = MockSource::new();
        fs.add_dir("/mnt/usb");
        fs.add_command(
            "df -P /mnt/usb",
            "Filesystem 512-blocks Used Available Capacity Mounted on\n/dev/sdc1 10 5 5 50% /mnt/usb\n",
        );
        assert_eq!(collect(&fs, Path::new("/mnt/usb"), 10.0).await, None);
        assert_eq!(fs.read_count("df -P /mnt/usb"), 0);
    }

    #[tokio::test]
    async fn reserved_space_beyond_tolerance_is_still_reported() {
        let mut fs = mounted_root();
        fs.add_command(
            "df -P /",
            "Filesystem 1024-blocks Used Available Capacity Mounted on\n/dev/sda1 1000 500 300 63% /\n",
        );
        let usage = collect(&fs, Path::new("/"), 10.0).await.unwrap();
        assert_eq!(usage.used_percent, 63.0);
    }
}
