//! Locale-fixed formatting: Indian rupee amounts and British-style dates.

use chrono::NaiveDate;

/// Currency symbol prefixed to every amount.
pub const CURRENCY_SYMBOL: &str = "\u{20B9}";

/// Format an amount as en-IN rupees with exactly two decimals.
///
/// Grouping follows the Indian convention: the last three integer digits
/// form one group and the remaining digits are grouped in pairs
/// (`₹1,23,45,678.90`). Rounding is half away from zero on the cent.
pub fn format_currency(amount: f64) -> String {
    let abs = amount.abs();
    let scaled = abs * 100.0;
    let rounded = if scaled.is_finite() {
        scaled.round() / 100.0
    } else {
        abs
    };
    let fixed = format!("{:.2}", rounded);
    let (int_digits, frac_digits) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let negative = amount < 0.0 && rounded > 0.0;

    format!(
        "{}{}{}.{}",
        if negative { "-" } else { "" },
        CURRENCY_SYMBOL,
        group_indian(int_digits),
        frac_digits
    )
}

/// Insert Indian digit-group separators into a string of integer digits.
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    let mut out = groups.join(",");
    out.push(',');
    out.push_str(tail);
    out
}

/// `DD Month YYYY`, e.g. `05 March 2025`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d %B %Y").to_string()
}

/// `Month YYYY`, e.g. `March 2025`.
pub fn format_month(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

/// Day counts are displayed in their shortest decimal form (`30`, `1.5`).
pub fn format_days(days: f64) -> String {
    format!("{days}")
}

/// Parse a `YYYY-MM` month value into the first day of that month.
pub fn parse_month(value: &str) -> Option<NaiveDate> {
    let (year, month) = value.trim().split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
}

/// Parse a `YYYY-MM-DD` date value.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// `YYYY-MM` key for a date, the format of the month picker.
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}
