/// Format a mean (or any statistic) with two decimal places, the precision
/// used throughout the reports.
///
/// # Examples
///
/// ```
/// use gradlens_core::formatting::format_mean;
///
/// assert_eq!(format_mean(80.0), "80.00");
/// assert_eq!(format_mean(33.333), "33.33");
/// ```
pub fn format_mean(value: f64) -> String {
    format!("{:.2}", value)
}

/// Format an optional standard deviation; absent values render as `-`.
pub fn format_std(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

/// Render an optional monthly count the way the source workbook displays it:
/// the long-dash placeholder for absent data, the number otherwise.
pub fn display_cell(value: Option<i64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "\u{30fc}".to_string(),
    }
}
