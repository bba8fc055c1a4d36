//! Number, date and label formatting shared by charts, tooltips and exports.

use chrono::{DateTime, Utc};

/// Compact display for tooltips: three significant decimals with K/M/B/T suffixes for large magnitudes.
pub fn significant_digits(v: f64) -> String {
    if v.is_nan() {
        return String::new();
    }
    if v == 0.0 {
        return "0".to_string();
    }
    let abs = v.abs();
    let (scaled, suffix) = if abs >= 1e12 {
        (v / 1e12, "T")
    } else if abs >= 1e9 {
        (v / 1e9, "B")
    } else if abs >= 1e6 {
        (v / 1e6, "M")
    } else if abs >= 1e3 {
        (v / 1e3, "K")
    } else if abs < 1e-3 {
        return format!("{:.3e}", v);
    } else {
        (v, "")
    };
    let rounded = (scaled * 1000.0).round() / 1000.0;
    format!("{}{}", rounded, suffix)
}

/// Axis tick label (same shape the chart widget and the PNG export use).
pub fn format_axis_label(v: f64) -> String {
    if v.abs() >= 1e6 || (v.abs() < 1e-2 && v != 0.0) {
        format!("{:.2e}", v)
    } else if (v - v.round()).abs() < 1e-10 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

/// Dates are carried as milliseconds since the Unix epoch.
pub fn format_date_millis(ms: f64) -> String {
    DateTime::from_timestamp_millis(ms.trunc() as i64)
        .map(|dt: DateTime<Utc>| {
            if dt.timestamp_millis() % 86_400_000 == 0 {
                dt.format("%Y-%m-%d").to_string()
            } else {
                dt.format("%Y-%m-%d %H:%M").to_string()
            }
        })
        .unwrap_or_else(|| format_axis_label(ms))
}

/// Cuts `s` to at most `max_len` characters, marking the cut with an ellipsis. 0 means no limit.
pub fn truncate(s: &str, max_len: usize) -> String {
    if max_len == 0 || s.chars().count() <= max_len {
        return s.to_string();
    }
    let keep = max_len.saturating_sub(1);
    let mut out: String = s.chars().take(keep).collect();
    out.push('…');
    out
}

pub fn format_number_with_commas(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let chars: Vec<char> = s.chars().rev().collect();

    for (i, ch) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*ch);
    }

    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_significant_digits() {
        assert_eq!(significant_digits(0.0), "0");
        assert_eq!(significant_digits(1.0), "1");
        assert_eq!(significant_digits(2.5), "2.5");
        assert_eq!(significant_digits(1.23456), "1.235");
        assert_eq!(significant_digits(1500.0), "1.5K");
        assert_eq!(significant_digits(-2_000_000.0), "-2M");
        assert_eq!(significant_digits(f64::NAN), "");
    }

    #[test]
    fn test_format_axis_label() {
        assert_eq!(format_axis_label(3.0), "3");
        assert_eq!(format_axis_label(2.5), "2.50");
        assert_eq!(format_axis_label(2_000_000.0), "2.00e6");
    }

    #[test]
    fn test_format_date_millis() {
        assert_eq!(format_date_millis(0.0), "1970-01-01");
        assert_eq!(format_date_millis(86_400_000.0 + 3_600_000.0), "1970-01-02 01:00");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("banana", 0), "banana");
        assert_eq!(truncate("banana", 6), "banana");
        assert_eq!(truncate("banana", 4), "ban…");
        assert_eq!(truncate("banana", 4).chars().count(), 4);
    }

    #[test]
    fn test_commas() {
        assert_eq!(format_number_with_commas(0), "0");
        assert_eq!(format_number_with_commas(1234567), "1,234,567");
    }
}
