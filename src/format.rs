//! Display helpers for amounts and dates

use chrono::{DateTime, NaiveDateTime};

/// Format an amount as Chilean pesos, e.g. `$15.000`.
///
/// CLP has no minor unit, so amounts are whole pesos grouped by dots.
pub fn format_clp(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    if amount < 0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// Format a backend transaction timestamp for display.
///
/// Accepts RFC 3339 or a naive `YYYY-MM-DDTHH:MM:SS` timestamp; anything
/// else is returned unchanged.
pub fn format_transaction_date(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%d-%m-%Y %H:%M").to_string();
    }

    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
            return dt.format("%d-%m-%Y %H:%M").to_string();
        }
    }

    raw.to_string()
}
