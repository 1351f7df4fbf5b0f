use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const NOT_AVAILABLE: &str = "N/A";

pub const MAX_NAME_WIDTH: usize = 15;
const TRUNCATED_NAME_WIDTH: usize = 12;
const ELLIPSIS: &str = "...";

const BYTE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Unsigned integer or decimal: `^[0-9]+(\.[0-9]+)?$`.
pub fn is_numeric(s: &str) -> bool {
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    all_digits(int_part) && frac_part.is_none_or(all_digits)
}

pub fn parse_validated(s: &str) -> Option<f64> {
    if is_numeric(s) { s.parse().ok() } else { None }
}

pub fn parse_validated_u64(s: &str) -> Option<u64> {
    if is_numeric(s) && !s.contains('.') {
        s.parse().ok()
    } else {
        None
    }
}

pub trait Numeric {
    fn to_number(&self) -> Option<f64>;
}

impl Numeric for f64 {
    fn to_number(&self) -> Option<f64> {
        (self.is_finite() && *self >= 0.0).then_some(*self)
    }
}

impl Numeric for f32 {
    fn to_number(&self) -> Option<f64> {
        f64::from(*self).to_number()
    }
}

impl Numeric for u64 {
    fn to_number(&self) -> Option<f64> {
        Some(*self as f64)
    }
}

impl Numeric for u32 {
    fn to_number(&self) -> Option<f64> {
        Some(f64::from(*self))
    }
}

impl Numeric for usize {
    fn to_number(&self) -> Option<f64> {
        Some(*self as f64)
    }
}

impl Numeric for str {
    fn to_number(&self) -> Option<f64> {
        parse_validated(self)
    }
}

impl Numeric for &str {
    fn to_number(&self) -> Option<f64> {
        parse_validated(self)
    }
}

impl Numeric for String {
    fn to_number(&self) -> Option<f64> {
        parse_validated(self)
    }
}

impl<T: Numeric> Numeric for Option<T> {
    fn to_number(&self) -> Option<f64> {
        self.as_ref().and_then(|v| v.to_number())
    }
}

pub fn format_bytes(n: impl Numeric) -> String {
    format_bytes_with(n, 1)
}

pub fn format_bytes_with(n: impl Numeric, precision: usize) -> String {
    let Some(mut value) = n.to_number() else {
        return NOT_AVAILABLE.to_string();
    };
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.precision$} {}", BYTE_UNITS[unit])
}

pub fn format_percentage(n: impl Numeric) -> String {
    format_percentage_with(n, 1)
}

pub fn format_percentage_with(n: impl Numeric, precision: usize) -> String {
    match n.to_number() {
        Some(value) => format!("{value:.precision$}%"),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_decimal(n: impl Numeric) -> String {
    format_decimal_with(n, 2)
}

pub fn format_decimal_with(n: impl Numeric, precision: usize) -> String {
    match n.to_number() {
        Some(value) => format!("{value:.precision$}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_duration_label(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;

    let plural = |n: u64, unit: &str| {
        if n == 1 {
            format!("{n} {unit}")
        } else {
            format!("{n} {unit}s")
        }
    };

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(plural(days, "day"));
    }
    if days > 0 || hours > 0 {
        parts.push(plural(hours, "hour"));
    }
    parts.push(plural(minutes, "minute"));
    parts.join(", ")
}

/// Shortens a process name wider than [`MAX_NAME_WIDTH`] to 12 columns plus `...`.
pub fn truncate_name(name: &str) -> String {
    if name.width() <= MAX_NAME_WIDTH {
        return name.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in name.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > TRUNCATED_NAME_WIDTH {
            break;
        }
        result.push(ch);
        width += ch_width;
    }
    result.push_str(ELLIPSIS);
    result
}

pub fn pad_right(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(s.width());
    format!("{s}{}", " ".repeat(fill))
}

pub fn pad_left(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(s.width());
    format!("{}{s}", " ".repeat(fill))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn validator_accepts_integers_and_decimals() {
        assert!(is_numeric("0"));
        assert!(is_numeric("12"));
        assert!(is_numeric("12.34"));
    }

    #[test]
    fn validator_rejects_malformed_text() {
        assert!(!is_numeric(""));
        assert!(!is_numeric("12.34.5"));
        assert!(!is_numeric("-1"));
        assert!(!is_numeric("+1"));
        assert!(!is_numeric(".5"));
        assert!(!is_numeric("5."));
        assert!(!is_numeric("1e5"));
        assert!(!is_numeric(" 1"));
        assert!(!is_numeric("69%"));
    }

    #[test]
    fn bytes_scale_to_largest_unit() {
        assert_eq!(format_bytes(0u64), "0.0 B");
        assert_eq!(format_bytes(1023u64), "1023.0 B");
        assert_eq!(format_bytes(1024u64), "1.0 KB");
        assert_eq!(format_bytes(1_048_576u64), "1.0 MB");
        assert_eq!(format_bytes(1_610_612_736u64), "1.5 GB");
        assert_eq!(format_bytes_with(1_048_576u64, 2), "1.00 MB");
    }

    #[test]
    fn bytes_cap_at_terabytes() {
        let five_pb = 5u64 * 1024 * 1024 * 1024 * 1024 * 1024;
        assert_eq!(format_bytes(five_pb), "5120.0 TB");
    }

    #[test]
    fn invalid_input_formats_as_not_available() {
        assert_eq!(format_bytes("x"), "N/A");
        assert_eq!(format_bytes(None::<u64>), "N/A");
        assert_eq!(format_percentage("-3"), "N/A");
        assert_eq!(format_percentage(f64::NAN), "N/A");
        assert_eq!(format_decimal(""), "N/A");
    }

    #[test]
    fn text_input_is_validated_then_formatted() {
        assert_eq!(format_bytes("1024"), "1.0 KB");
        assert_eq!(format_percentage("42.26"), "42.3%");
        assert_eq!(format_decimal("3.14159"), "3.14");
    }

    #[test]
    fn percentages_and_decimals_use_fixed_precision() {
        assert_eq!(format_percentage(80.0), "80.0%");
        assert_eq!(format_percentage_with(12.346, 2), "12.35%");
        assert_eq!(format_decimal(0.5), "0.50");
        assert_eq!(format_decimal_with(Some(1.0), 0), "1");
    }

    #[test]
    fn duration_labels() {
        assert_eq!(format_duration_label(59), "0 minutes");
        assert_eq!(format_duration_label(3_660), "1 hour, 1 minute");
        assert_eq!(
            format_duration_label(3 * 86_400 + 4 * 3_600 + 5 * 60),
            "3 days, 4 hours, 5 minutes"
        );
        assert_eq!(format_duration_label(86_400), "1 day, 0 hours, 0 minutes");
    }

    #[test]
    fn long_names_are_truncated_with_ellipsis() {
        assert_eq!(truncate_name("systemd"), "systemd");
        assert_eq!(truncate_name("exactly15chars_"), "exactly15chars_");
        assert_eq!(truncate_name("gnome-shell-calendar-server"), "gnome-shell-...");
        assert_eq!(truncate_name("gnome-shell-calendar-server").len(), 15);
    }

    #[test]
    fn padding_respects_display_width() {
        assert_eq!(pad_right("ab", 4), "ab  ");
        assert_eq!(pad_left("ab", 4), "  ab");
        assert_eq!(pad_right("abcdef", 4), "abcdef");
    }

    proptest! {
        #[test]
        fn digit_strings_always_validate(
            int in "[0-9]{1,12}",
            frac in proptest::option::of("[0-9]{1,6}"),
        ) {
            let s = match frac {
                Some(f) => format!("{int}.{f}"),
                None => int,
            };
            prop_assert!(is_numeric(&s));
        }

        #[test]
        fn strings_with_foreign_chars_never_validate(s in "[0-9]*[^0-9.][0-9.]*") {
            prop_assert!(!is_numeric(&s));
        }

        #[test]
        fn formatted_bytes_always_carry_a_unit(n in any::<u64>()) {
            let out = format_bytes(n);
            let has_unit = BYTE_UNITS.iter().any(|u| out.ends_with(&format!(" {u}")));
            prop_assert!(has_unit, "no unit in {:?}", out);
        }

        #[test]
        fn truncated_names_fit_the_column(name in "[a-zA-Z0-9_./-]{0,40}") {
            prop_assert!(truncate_name(&name).width() <= MAX_NAME_WIDTH);
        }
    }
}
