//! Display formatting for prices, changes, and volumes
//!
//! All helpers take the store's raw numeric strings and degrade to a
//! placeholder (or empty string) instead of failing on bad input.

/// Shown wherever a value is missing or unparseable
pub const PLACEHOLDER: &str = "—";

/// Price with tiered precision: large prices get 2 decimals and thousands
/// grouping, prices under 1 keep more significant digits.
pub fn format_price(raw: Option<&str>) -> String {
    let Some(n) = parse_finite(raw) else {
        return PLACEHOLDER.to_string();
    };

    if n >= 1000.0 {
        group_thousands(&format!("{:.2}", n))
    } else if n >= 1.0 {
        trim_decimals(format!("{:.4}", n), 2)
    } else {
        trim_decimals(format!("{:.6}", n), 4)
    }
}

/// Signed percent change with two decimals, e.g. `+1.25%`. Missing or
/// unparseable input renders as an empty string so the cell stays blank.
pub fn format_change(raw: Option<&str>) -> String {
    let Some(n) = parse_finite(raw) else {
        return String::new();
    };

    // Negative zero would otherwise render as "+-0.00%"
    let n = if n == 0.0 { 0.0 } else { n };
    let sign = if n >= 0.0 { "+" } else { "" };
    format!("{}{:.2}%", sign, n)
}

/// Volume abbreviated to `K`/`M`/`B`. Negative input is treated as missing.
pub fn format_volume(raw: Option<&str>) -> String {
    let Some(n) = parse_finite(raw) else {
        return PLACEHOLDER.to_string();
    };
    if n < 0.0 {
        return PLACEHOLDER.to_string();
    }

    if n >= 1e9 {
        format!("{:.2}B", n / 1e9)
    } else if n >= 1e6 {
        format!("{:.2}M", n / 1e6)
    } else if n >= 1e3 {
        format!("{:.2}K", n / 1e3)
    } else {
        format!("{:.0}", n)
    }
}

fn parse_finite(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|r| r.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

fn trim_decimals(mut fixed: String, min_decimals: usize) -> String {
    if let Some(dot) = fixed.find('.') {
        let min_len = dot + 1 + min_decimals;
        while fixed.len() > min_len && fixed.ends_with('0') {
            fixed.pop();
        }
    }
    fixed
}

fn group_thousands(fixed: &str) -> String {
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (fixed, None),
    };

    let chars: Vec<char> = int_part.chars().collect();
    let mut grouped = String::new();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && c.is_ascii_digit() && (chars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }

    match frac_part {
        Some(frac_part) => format!("{}.{}", grouped, frac_part),
        None => grouped,
    }
}
