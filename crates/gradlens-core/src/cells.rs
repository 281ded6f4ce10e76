use chrono::{Duration, NaiveDate};
use serde_json::Value;
use tracing::warn;

/// Placeholder glyphs that mean "no data recorded" in the source workbook,
/// as opposed to a recorded zero. The list covers the dash variants observed
/// across sheet revisions plus the empty string.
pub const SENTINEL_GLYPHS: &[&str] = &["\u{30fc}", "\u{ff0d}", "-", "\u{2014}", "\u{2013}", ""];

// ── CellValue ─────────────────────────────────────────────────────────────────

/// Converts raw grid cells into optional numbers.
///
/// This is the single conversion rule used by every downstream numeric field:
/// sentinels and parse failures are recovered as absent, never raised.
pub struct CellValue;

impl CellValue {
    /// Convert a raw cell into an optional count.
    ///
    /// * `null` / blank / sentinel glyph → `None`
    /// * JSON number → truncated to integer
    /// * JSON string → parsed as a floating-point number, truncated;
    ///   parse failure → `None`
    pub fn to_count(value: &Value) -> Option<i64> {
        match value {
            Value::Null => None,
            Value::Number(n) => n.as_f64().map(|f| f.trunc() as i64),
            Value::String(s) => {
                let trimmed = s.trim();
                if SENTINEL_GLYPHS.contains(&trimmed) {
                    return None;
                }
                trimmed.parse::<f64>().ok().map(|f| f.trunc() as i64)
            }
            _ => None,
        }
    }

    /// Extract a trimmed, non-empty text value from a cell.
    ///
    /// Numbers are rendered through their JSON form so a numeric name cell
    /// still yields text.
    pub fn to_text(value: &Value) -> Option<String> {
        let s = match value {
            Value::Null => return None,
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }
}

// ── DateCell ──────────────────────────────────────────────────────────────────

/// Day 0 of the spreadsheet serial-date scheme.
const SERIAL_DATE_BASE: (i32, u32, u32) = (1899, 12, 30);

/// Parses dates from the variety of cell shapes found in sheet exports.
pub struct DateCell;

impl DateCell {
    /// Attempt to parse a raw cell into a calendar date.
    ///
    /// Handles:
    /// * `null` / blank / sentinel glyph → `None`
    /// * JSON string: ISO dates, common date-time patterns, `/`-separated
    ///   dates.
    /// * JSON number: spreadsheet serial day count (days since 1899-12-30).
    pub fn parse(value: &Value) -> Option<NaiveDate> {
        match value {
            Value::Null => None,
            Value::String(s) => Self::parse_str(s.trim()),
            Value::Number(n) => {
                let days = n.as_f64()?.trunc() as i64;
                if days <= 0 {
                    return None;
                }
                let (y, m, d) = SERIAL_DATE_BASE;
                NaiveDate::from_ymd_opt(y, m, d)
                    .and_then(|base| base.checked_add_signed(Duration::days(days)))
            }
            _ => None,
        }
    }

    fn parse_str(s: &str) -> Option<NaiveDate> {
        if SENTINEL_GLYPHS.contains(&s) {
            return None;
        }

        const FORMATS: &[&str] = &[
            "%Y-%m-%d",
            "%Y/%m/%d",
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
        ];

        for fmt in FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return Some(date);
            }
            if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
                return Some(dt.date());
            }
        }

        warn!("DateCell: could not parse date string \"{}\"", s);
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
