//! Locale-agnostic numeric coercion for table cells.
//!
//! A cell that does not coerce yields `None` and is dropped by the caller;
//! it is never replaced with zero.

/// Fold Arabic-Indic and Eastern Arabic-Indic digits to ASCII, map the
/// Arabic decimal separator to `.`, and remove grouping separators.
pub fn fold_digits(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| match c {
            '\u{0660}'..='\u{0669}' => char::from_digit(c as u32 - 0x0660, 10),
            '\u{06f0}'..='\u{06f9}' => char::from_digit(c as u32 - 0x06f0, 10),
            '\u{066b}' => Some('.'),
            '\u{066c}' | ',' | '\u{a0}' | '\u{202f}' | ' ' => None,
            _ => Some(c),
        })
        .collect()
}

/// Parse a cell as a finite number, tolerating a trailing percent sign.
pub fn parse_number(raw: &str) -> Option<f64> {
    let folded = fold_digits(raw.trim());
    let trimmed = folded
        .trim()
        .trim_end_matches(['%', '\u{066a}'])
        .trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A tenor header cell: a positive whole number of days.
pub fn parse_tenor(raw: &str) -> Option<u32> {
    let value = parse_number(raw)?;
    if value <= 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return None;
    }
    Some(value as u32)
}

/// A yield cell: a positive percentage.
pub fn parse_yield(raw: &str) -> Option<f64> {
    parse_number(raw).filter(|v| *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_variants() {
        assert_eq!(parse_number("27.192"), Some(27.192));
        assert_eq!(parse_number(" 27.192 % "), Some(27.192));
        assert_eq!(parse_number("٢٧٫١٩٢"), Some(27.192));
        assert_eq!(parse_number("۹۱"), Some(91.0));
        assert_eq!(parse_number("1,250.5"), Some(1250.5));
        assert_eq!(parse_number("البيان"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("%"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn test_parse_tenor() {
        assert_eq!(parse_tenor("91"), Some(91));
        assert_eq!(parse_tenor("364.0"), Some(364));
        assert_eq!(parse_tenor("٢٧٣"), Some(273));
        assert_eq!(parse_tenor("91.5"), None);
        assert_eq!(parse_tenor("0"), None);
        assert_eq!(parse_tenor("-91"), None);
        assert_eq!(parse_tenor("البيان"), None);
    }

    #[test]
    fn test_parse_yield() {
        assert_eq!(parse_yield("25.043"), Some(25.043));
        assert_eq!(parse_yield("0"), None);
        assert_eq!(parse_yield("-1.5"), None);
        assert_eq!(parse_yield("n/a"), None);
    }
}
