//! BRL money formatting and parsing.
//!
//! All marketplace prices are Brazilian reais. Display formatting follows the
//! pt-BR convention: `.` groups thousands, `,` separates cents, and amounts
//! always carry two fraction digits (`1234.5` renders as `R$ 1.234,50`).
//! Parsing accepts the same shape back so the pair round-trips.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur when parsing a BRL amount.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The input string is empty after stripping the currency prefix.
    #[error("amount cannot be empty")]
    Empty,
    /// The input is not a well-formed pt-BR amount.
    #[error("invalid amount: {0}")]
    Invalid(String),
}

/// Format a decimal amount as a pt-BR currency string.
///
/// Amounts are rounded half-away-from-zero to two decimal places.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use segundo_lote_core::format_brl;
///
/// let amount: Decimal = "1234.5".parse().unwrap();
/// assert_eq!(format_brl(amount), "R$ 1.234,50");
/// ```
#[must_use]
pub fn format_brl(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(
        2,
        rust_decimal::RoundingStrategy::MidpointAwayFromZero,
    );
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let fixed = format!("{:.2}", rounded.abs());

    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let sign = if negative { "-" } else { "" };
    format!("{sign}R$ {},{frac_part}", group_thousands(int_part))
}

/// Parse a pt-BR currency string back into a decimal amount.
///
/// Accepts an optional `R$` prefix and an optional leading minus sign;
/// `.` is treated as a grouping separator and `,` as the decimal mark.
///
/// # Errors
///
/// Returns [`MoneyError`] if the input is empty or not a valid amount.
///
/// # Examples
///
/// ```
/// use segundo_lote_core::parse_brl;
///
/// let amount = parse_brl("R$ 1.234,50").unwrap();
/// assert_eq!(amount.to_string(), "1234.50");
/// ```
pub fn parse_brl(input: &str) -> Result<Decimal, MoneyError> {
    let trimmed = input.trim();
    let (negative, trimmed) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };
    let trimmed = trimmed
        .strip_prefix("R$")
        .map_or(trimmed, str::trim_start);

    if trimmed.is_empty() {
        return Err(MoneyError::Empty);
    }

    // Drop grouping dots, turn the decimal comma into a dot.
    let mut normalized = String::with_capacity(trimmed.len());
    let mut seen_comma = false;
    for c in trimmed.chars() {
        match c {
            '.' if !seen_comma => {}
            ',' if !seen_comma => {
                seen_comma = true;
                normalized.push('.');
            }
            '0'..='9' => normalized.push(c),
            _ => return Err(MoneyError::Invalid(input.to_owned())),
        }
    }

    let amount: Decimal = normalized
        .parse()
        .map_err(|_| MoneyError::Invalid(input.to_owned()))?;

    Ok(if negative { -amount } else { amount })
}

/// Insert `.` every three digits, right to left.
fn group_thousands(digits: &str) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut out = String::with_capacity(chars.len() + chars.len() / 3);
    for (i, c) in chars.iter().enumerate() {
        let remaining = chars.len() - i;
        if i > 0 && remaining % 3 == 0 {
            out.push('.');
        }
        out.push(*c);
    }
    out
}
