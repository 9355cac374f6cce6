//! Number formatting for the dashboard

/// Shown where a value is undefined
pub const NOT_AVAILABLE: &str = "n/a";

/// Inserts a comma between every group of three digits
fn group_digits(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Rounds to a whole number and splits off the sign
///
/// Works on the float directly, so magnitudes beyond `i64` keep all digits.
fn whole_parts(value: f64) -> (&'static str, String) {
    let magnitude = value.abs().round();
    let sign = if value < 0.0 && magnitude > 0.0 { "-" } else { "" };
    (sign, group_digits(&format!("{:.0}", magnitude)))
}

/// Whole-dollar amount with separators, e.g. `$1,234`
pub fn format_money(value: f64) -> String {
    let (sign, digits) = whole_parts(value);
    format!("{}${}", sign, digits)
}

/// Compact dollar amount for summary cards, e.g. `$1.2K` or `$3.40M`
pub fn format_currency(value: Option<f64>) -> String {
    let Some(value) = value else {
        return NOT_AVAILABLE.to_string();
    };
    let sign = if value < 0.0 { "-" } else { "" };
    let magnitude = value.abs();
    if magnitude >= 1_000_000.0 {
        format!("{}${:.2}M", sign, magnitude / 1_000_000.0)
    } else if magnitude >= 1_000.0 {
        format!("{}${:.1}K", sign, magnitude / 1_000.0)
    } else {
        format_money(value)
    }
}

/// Count with separators
pub fn format_count(value: Option<f64>) -> String {
    match value {
        Some(value) => {
            let (sign, digits) = whole_parts(value);
            format!("{}{}", sign, digits)
        }
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Cost of acquisition with cents
pub fn format_cac(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("${:.2}", value),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Share with one decimal, e.g. `24.1%`
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{:.1}%", value),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Year-over-year change, e.g. `▲ 12.5% YoY`
pub fn format_delta(percent: f64) -> String {
    let arrow = if percent >= 0.0 { "▲" } else { "▼" };
    format!("{} {:.1}% YoY", arrow, percent.abs())
}
