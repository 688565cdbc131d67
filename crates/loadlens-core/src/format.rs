//! Number formatting shared by the narrative and the renderer.

/// Format an integer with comma thousands separators (`1234567` -> `1,234,567`).
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Milliseconds rounded to a whole number, e.g. `"437ms"`.
pub fn format_ms(ms: f64) -> String {
    format!("{}ms", ms.round())
}

/// Percentage with two decimals, e.g. `"99.50%"`.
pub fn format_percent(pct: f64) -> String {
    format!("{pct:.2}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_thousands_small_numbers_unchanged() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
    }

    #[test]
    fn group_thousands_inserts_separators() {
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(123456), "123,456");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn format_ms_rounds() {
        assert_eq!(format_ms(436.6), "437ms");
        assert_eq!(format_ms(0.2), "0ms");
    }

    #[test]
    fn format_percent_two_decimals() {
        assert_eq!(format_percent(99.5), "99.50%");
        assert_eq!(format_percent(100.0), "100.00%");
    }
}
