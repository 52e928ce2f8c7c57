//! Lenient cell parsing shared by the table loaders.

/// Parse a numeric cell, treating blanks and `NaN` as missing.
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    (!value.is_nan()).then_some(value)
}

/// Parse an integer cell; integral floats such as `3.0` are accepted.
pub(crate) fn parse_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(value);
    }
    let value = parse_number(trimmed)?;
    let in_range = value.is_finite() && value.abs() < i64::MAX as f64;
    (in_range && value.fract() == 0.0).then_some(value as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("42", Some(42))]
    #[case(" 7 ", Some(7))]
    #[case("3.0", Some(3))]
    #[case("3.5", None)]
    #[case("", None)]
    #[case("abc", None)]
    #[case("NaN", None)]
    fn parses_integers(#[case] raw: &str, #[case] expected: Option<i64>) {
        assert_eq!(parse_integer(raw), expected);
    }

    #[rstest]
    #[case("0.5", Some(0.5))]
    #[case("-2", Some(-2.0))]
    #[case("nan", None)]
    #[case("n/a", None)]
    fn parses_numbers(#[case] raw: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_number(raw), expected);
    }
}
