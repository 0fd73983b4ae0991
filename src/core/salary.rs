//! Lenient salary parsing and display formatting.
//!
//! Candidate salaries are free text ("$60k/yr", "12 LPA", "1.2 cr"). Parsing
//! takes the first number in the text and applies a magnitude suffix if one
//! follows it.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Magnitude suffixes, longest spelling first so `lakh` wins over `l`.
const SUFFIXES: [(&str, i64); 9] = [
    ("crore", 10_000_000),
    ("cr", 10_000_000),
    ("lakh", 100_000),
    ("lac", 100_000),
    ("lpa", 100_000),
    ("l", 100_000),
    ("k", 1_000),
    ("mn", 1_000_000),
    ("m", 1_000_000),
];

/// Parses a human-entered salary into an amount.
///
/// Returns `None` when the text holds no number or the scaled amount does
/// not fit in a `Decimal`.
#[must_use]
pub fn parse_salary(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();

    let start = cleaned.find(|c: char| c.is_ascii_digit())?;
    let tail = &cleaned[start..];
    let end = tail
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(tail.len());
    let number = tail[..end].trim_end_matches('.');
    let amount = Decimal::from_str(number).ok()?;

    let rest = tail[end..].trim_start();
    let multiplier = SUFFIXES
        .iter()
        .find(|(suffix, _)| {
            rest.strip_prefix(suffix)
                .is_some_and(|after| !after.starts_with(|c: char| c.is_ascii_alphabetic()))
        })
        .map_or(1, |(_, factor)| *factor);

    amount.checked_mul(Decimal::from(multiplier))
}

/// Formats an amount with thousands separators, dropping a zero fraction:
/// `60000` becomes `60,000`, `1234.5` becomes `1,234.50`.
#[must_use]
pub fn format_salary(amount: Decimal) -> String {
    let rounded = amount.round_dp(2).to_string();
    let (sign, unsigned) = rounded
        .strip_prefix('-')
        .map_or(("", rounded.as_str()), |rest| ("-", rest));
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if fraction.trim_end_matches('0').is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{fraction:0<2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn test_plain_and_grouped_numbers() {
        assert_eq!(parse_salary("60000"), Some(dec(60_000)));
        assert_eq!(parse_salary("60,000"), Some(dec(60_000)));
        assert_eq!(parse_salary("  75000.50 "), Decimal::from_str("75000.50").ok());
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(parse_salary("$60k/yr"), Some(dec(60_000)));
        assert_eq!(parse_salary("12 LPA"), Some(dec(1_200_000)));
        assert_eq!(parse_salary("1.2 cr"), Some(dec(12_000_000)));
        assert_eq!(parse_salary("2.5M"), Some(dec(2_500_000)));
        assert_eq!(parse_salary("8 lakh"), Some(dec(800_000)));
    }

    #[test]
    fn test_words_that_only_start_like_suffixes() {
        // "5000 monthly" is not five billion
        assert_eq!(parse_salary("5000 monthly"), Some(dec(5_000)));
    }

    #[test]
    fn test_no_number() {
        assert_eq!(parse_salary(""), None);
        assert_eq!(parse_salary("negotiable"), None);
    }

    #[test]
    fn test_out_of_range_amounts() {
        assert_eq!(parse_salary("9999999999999999999999999999 cr"), None);
        assert_eq!(parse_salary("99999999999999999999999999999999999"), None);
        assert_eq!(
            parse_salary("9999999999999999999999999999"),
            Decimal::from_str("9999999999999999999999999999").ok()
        );
    }

    #[test]
    fn test_format_salary() {
        assert_eq!(format_salary(dec(60_000)), "60,000");
        assert_eq!(format_salary(dec(1_200_000)), "1,200,000");
        assert_eq!(format_salary(dec(999)), "999");
        assert_eq!(
            format_salary(Decimal::from_str("1234.5").unwrap_or_default()),
            "1,234.50"
        );
        assert_eq!(format_salary(dec(-4_500)), "-4,500");
    }
}
