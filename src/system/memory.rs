use serde::Serialize;
use tracing::debug;

use super::chain::{Candidate, ParseError, first_success};
use super::source::{NativeProbe, Source, SourceReader};
use crate::format::parse_validated_u64;

const KIB: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MemoryUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub used_percent: f64,
    pub available_percent: f64,
}

impl MemoryUsage {
    /// Percentages are computed independently; both are 0 when `total` is 0.
    pub fn new(total_bytes: u64, used_bytes: u64, available_bytes: u64) -> Self {
        let percent = |part: u64| {
            if total_bytes == 0 {
                0.0
            } else {
                part as f64 * 100.0 / total_bytes as f64
            }
        };
        Self {
            total_bytes,
            used_bytes,
            available_bytes,
            used_percent: percent(used_bytes),
            available_percent: percent(available_bytes),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemFields {
    pub total: u64,
    pub free: u64,
    pub available: Option<u64>,
    pub buffers: u64,
    pub cached: u64,
    pub slab: u64,
}

impl MemFields {
    /// Prefers `total − available`; otherwise subtracts free, buffers, cached
    /// and slab from total, flooring at zero.
    pub fn usage(&self) -> MemoryUsage {
        let (used, available) = match self.available {
            Some(available) => (self.total.saturating_sub(available), available),
            None => {
                let reclaimable = self
                    .free
                    .saturating_add(self.buffers)
                    .saturating_add(self.cached)
                    .saturating_add(self.slab);
                let used = self.total.saturating_sub(reclaimable);
                (used, self.total - used)
            }
        };
        MemoryUsage::new(self.total, used, available)
    }

    fn scaled(self, factor: u64) -> Self {
        Self {
            total: self.total.saturating_mul(factor),
            free: self.free.saturating_mul(factor),
            available: self.available.map(|a| a.saturating_mul(factor)),
            buffers: self.buffers.saturating_mul(factor),
            cached: self.cached.saturating_mul(factor),
            slab: self.slab.saturating_mul(factor),
        }
    }
}

/// Parses `Label:   value kB` lines. `MemTotal` and `MemFree` are required;
/// `Buffers`, `Cached` and `Slab` count as 0 when absent or invalid, and an
/// invalid `MemAvailable` is ignored.
pub fn parse_meminfo(raw: &str) -> Result<MemFields, ParseError> {
    let value_of = |label: &str| {
        raw.lines().find_map(|line| {
            let (key, rest) = line.split_once(':')?;
            (key.trim() == label).then(|| rest.split_whitespace().next().unwrap_or(""))
        })
    };
    let required = |label: &'static str| -> Result<u64, ParseError> {
        let value = value_of(label).ok_or(ParseError::Missing(label))?;
        parse_validated_u64(value).ok_or_else(|| ParseError::invalid(label, value))
    };
    let optional = |label: &'static str| -> Option<u64> {
        let value = value_of(label)?;
        let parsed = parse_validated_u64(value);
        if parsed.is_none() {
            debug!(label, value, "ignoring invalid meminfo field");
        }
        parsed
    };

    let fields = MemFields {
        total: required("MemTotal")?,
        free: required("MemFree")?,
        available: optional("MemAvailable"),
        buffers: optional("Buffers").unwrap_or(0),
        cached: optional("Cached").unwrap_or(0),
        slab: optional("Slab").unwrap_or(0),
    };
    Ok(fields.scaled(KIB))
}

/// Parses the `Mem:` row of `free` output, scaling values by `unit` bytes.
///
/// With an `available` column, used is `total − available`. Older `free`
/// has none, so available is the `free` column and used is reported as is.
pub fn parse_free(raw: &str, unit: u64) -> Result<MemoryUsage, ParseError> {
    let header: Vec<&str> = raw
        .lines()
        .find(|line| line.split_whitespace().any(|col| col == "total"))
        .ok_or(ParseError::Missing("free header"))?
        .split_whitespace()
        .collect();
    let row: Vec<&str> = raw
        .lines()
        .find(|line| line.trim_start().starts_with("Mem:"))
        .ok_or(ParseError::Missing("Mem: row"))?
        .split_whitespace()
        .skip(1)
        .collect();

    let column = |name: &'static str| -> Result<Option<u64>, ParseError> {
        let Some(idx) = header.iter().position(|col| *col == name) else {
            return Ok(None);
        };
        let value = row.get(idx).ok_or(ParseError::FieldCount {
            expected: idx + 1,
            found: row.len(),
        })?;
        parse_validated_u64(value)
            .map(|v| Some(v.saturating_mul(unit)))
            .ok_or_else(|| ParseError::invalid(name, value))
    };

    let total = column("total")?.ok_or(ParseError::Missing("total column"))?;
    let used = column("used")?.ok_or(ParseError::Missing("used column"))?;
    let free = column("free")?.ok_or(ParseError::Missing("free column"))?;
    Ok(match column("available")? {
        Some(available) => MemoryUsage::new(total, total.saturating_sub(available), available),
        None => MemoryUsage::new(total, used.min(total), free),
    })
}

pub fn parse_native(raw: &str) -> Result<MemoryUsage, ParseError> {
    let fields: Vec<&str> = raw.split_whitespace().collect();
    if fields.len() < 2 {
        return Err(ParseError::FieldCount {
            expected: 2,
            found: fields.len(),
        });
    }
    let total =
        parse_validated_u64(fields[0]).ok_or_else(|| ParseError::invalid("total", fields[0]))?;
    let available =
        parse_validated_u64(fields[1]).ok_or_else(|| ParseError::invalid("available", fields[1]))?;
    Ok(MemoryUsage::new(total, total.saturating_sub(available), available))
}

pub async fn collect<R: SourceReader>(reader: &R) -> Option<MemoryUsage> {
    let candidates = vec![
        Candidate::new(Source::file("/proc/meminfo"), |raw: &str| {
            parse_meminfo(raw).map(|fields| fields.usage())
        }),
        Candidate::new(Source::command("free", &["-b"]), |raw: &str| parse_free(raw, 1)),
        Candidate::new(Source::command("free", &["-k"]), |raw: &str| parse_free(raw, KIB)),
        Candidate::new(Source::command("free", &[]), |raw: &str| parse_free(raw, KIB)),
        Candidate::new(Source::Native(NativeProbe::Memory), parse_native),
    ];
    first_success(reader, "memory", candidates).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::mock::MockSource;

    const MEMINFO: &str = "MemTotal:        8192000 kB\n\
                           MemFree:         1024000 kB\n\
                           MemAvailable:    4096000 kB\n\
                           Buffers:          256000 kB\n\
                           Cached:          2048000 kB\n\
                           SwapCached:            0 kB\n\
                           Slab:             512000 kB\n";

    #[test]
    fn available_field_drives_used() {
        let fields = MemFields {
            total: 8_192_000,
            free: 1_024_000,
            available: Some(4_096_000),
            ..MemFields::default()
        };
        let usage = fields.usage();
        assert_eq!(usage.used_bytes, 4_096_000);
        assert_eq!(usage.available_bytes, 4_096_000);
        assert_eq!(usage.used_percent, 50.0);
        assert_eq!(usage.available_percent, 50.0);
    }

    #[test]
    fn without_available_reclaimable_memory_is_subtracted() {
        let fields = MemFields {
            total: 8_000,
            free: 1_000,
            available: None,
            buffers: 500,
            cached: 2_000,
            slab: 500,
        };
        let usage = fields.usage();
        assert_eq!(usage.used_bytes, 4_000);
        assert_eq!(usage.available_bytes, 4_000);
    }

    #[test]
    fn negative_used_floors_at_zero() {
        let fields = MemFields {
            total: 1_000,
            free: 600,
            available: None,
            buffers: 300,
            cached: 300,
            slab: 0,
        };
        let usage = fields.usage();
        assert_eq!(usage.used_bytes, 0);
        assert_eq!(usage.available_bytes, 1_000);
        assert_eq!(usage.used_percent, 0.0);
    }

    #[test]
    fn zero_total_gives_zero_percentages() {
        let usage = MemoryUsage::new(0, 0, 0);
        assert_eq!(usage.used_percent, 0.0);
        assert_eq!(usage.available_percent, 0.0);
    }

    #[test]
    fn meminfo_is_scaled_to_bytes() {
        let fields = parse_meminfo(MEMINFO).unwrap();
        assert_eq!(fields.total, 8_192_000 * 1024);
        assert_eq!(fields.available, Some(4_096_000 * 1024));
        assert_eq!(fields.slab, 512_000 * 1024);
        assert_eq!(fields.usage().used_bytes, 4_096_000 * 1024);
    }

    #[test]
    fn meminfo_labels_match_exactly() {
        // SwapCached must not be mistaken for Cached.
        let raw = "MemTotal: 100 kB\nMemFree: 10 kB\nSwapCached: 50 kB\n";
        let fields = parse_meminfo(raw).unwrap();
        assert_eq!(fields.cached, 0);
    }

    #[test]
    fn meminfo_requires_total_and_free() {
        assert_eq!(
            parse_meminfo("MemFree: 10 kB\n"),
            Err(ParseError::Missing("MemTotal"))
        );
        assert!(matches!(
            parse_meminfo("MemTotal: lots kB\nMemFree: 10 kB\n"),
            Err(ParseError::Invalid { .. })
        ));
    }

    #[test]
    fn invalid_optional_fields_count_as_zero() {
        let raw = "MemTotal: 1000 kB\nMemFree: 100 kB\nBuffers: ?? kB\nCached: 100 kB\nSlab: -1 kB\n";
        let fields = parse_meminfo(raw).unwrap();
        assert_eq!(fields.buffers, 0);
        assert_eq!(fields.slab, 0);
        assert_eq!(fields.usage().used_bytes, 800 * 1024);
    }

    const FREE_BYTES: &str = "               total        used        free      shared  buff/cache   available\n\
                              Mem:      1000000000   400000000   100000000       12345   500000000   600000000\n\
                              Swap:     2000000000           0  2000000000\n";

    const FREE_OLD: &str = "             total       used       free     shared    buffers     cached\n\
                            Mem:          8000       6000       2000          0        500       1500\n\
                            -/+ buffers/cache:       4000       4000\n\
                            Swap:         1000          0       1000\n";

    #[test]
    fn free_with_available_column() {
        let usage = parse_free(FREE_BYTES, 1).unwrap();
        assert_eq!(usage.total_bytes, 1_000_000_000);
        assert_eq!(usage.available_bytes, 600_000_000);
        assert_eq!(usage.used_bytes, 400_000_000);
        assert_eq!(usage.used_percent, 40.0);
    }

    #[test]
    fn free_without_available_column_uses_free() {
        let usage = parse_free(FREE_OLD, 1024).unwrap();
        assert_eq!(usage.total_bytes, 8000 * 1024);
        assert_eq!(usage.used_bytes, 6000 * 1024);
        assert_eq!(usage.available_bytes, 2000 * 1024);
    }

    #[test]
    fn free_rejects_malformed_rows() {
        assert!(parse_free("no header here\n", 1).is_err());
        let bad = "total used free\nMem: 100 x 10\n";
        assert!(matches!(
            parse_free(bad, 1),
            Err(ParseError::Invalid { .. })
        ));
    }

    #[test]
    fn native_probe_text() {
        let usage = parse_native("2000 500\n").unwrap();
        assert_eq!(usage.used_bytes, 1500);
        assert!(parse_native("2000").is_err());
    }

    #[tokio::test]
    async fn meminfo_is_preferred() {
        let mut fs = MockSource::new();
        fs.add_file("/proc/meminfo", MEMINFO);
        fs.add_command("free -b", FREE_BYTES);
        let usage = collect(&fs).await.unwrap();
        assert_eq!(usage.total_bytes, 8_192_000 * 1024);
        assert_eq!(fs.read_count("free -b"), 0);
    }

    #[tokio::test]
    async fn old_free_is_read_once_and_uses_free_column() {
        let mut fs = MockSource::new();
        fs.add_command("free -k", FREE_OLD);
        let usage = collect(&fs).await.unwrap();
        assert_eq!(usage.available_bytes, 2000 * 1024);
        assert_eq!(fs.read_count("free -k"), 1);
        assert_eq!(fs.read_count("free"), 0);
    }

    #[tokio::test]
    async fn native_probe_is_last_resort() {
        let mut fs = MockSource::new();
        fs.add_native(NativeProbe::Memory, "4096 1024");
        let usage = collect(&fs).await.unwrap();
        assert_eq!(usage.used_bytes, 3072);
        assert_eq!(collect(&MockSource::new()).await, None);
    }
}
