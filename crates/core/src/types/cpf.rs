//! CPF (Cadastro de Pessoas Físicas) formatting and validation.
//!
//! Sellers and buyers are identified by CPF on payout and checkout flows.
//! Formatting is display-only and deliberately forgiving: anything that does
//! not carry exactly eleven digits is passed through unchanged so partially
//! typed input never gets mangled.

/// Format an eleven-digit CPF as `XXX.XXX.XXX-XX`.
///
/// Non-digit characters in the input are ignored when counting, so an
/// already formatted CPF is re-formatted canonically. Inputs with any other
/// digit count are returned unchanged.
///
/// # Examples
///
/// ```
/// use segundo_lote_core::format_cpf;
///
/// assert_eq!(format_cpf("12345678901"), "123.456.789-01");
/// assert_eq!(format_cpf("123"), "123");
/// ```
#[must_use]
pub fn format_cpf(input: &str) -> String {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 11 {
        return input.to_owned();
    }

    let mut out = String::with_capacity(14);
    for (i, c) in digits.chars().enumerate() {
        match i {
            3 | 6 => out.push('.'),
            9 => out.push('-'),
            _ => {}
        }
        out.push(c);
    }
    out
}

/// Check a CPF's mod-11 verifier digits.
///
/// Accepts formatted or bare input. Sequences of a single repeated digit
/// (e.g. `000.000.000-00`) pass the arithmetic but are rejected, matching
/// Receita Federal rules.
#[must_use]
pub fn is_valid_cpf(input: &str) -> bool {
    let digits: Vec<u32> = input.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 11 {
        return false;
    }
    if let Some(&first) = digits.first()
        && digits.iter().all(|&d| d == first)
    {
        return false;
    }

    let Some(body) = digits.get(..9) else {
        return false;
    };
    let Some(extended) = digits.get(..10) else {
        return false;
    };

    digits.get(9).copied() == Some(check_digit(body))
        && digits.get(10).copied() == Some(check_digit(extended))
}

/// Compute a CPF verifier digit over a 9- or 10-digit prefix.
///
/// Weights run from `len + 1` down to 2; the digit is `(sum * 10) mod 11`,
/// with 10 collapsing to 0.
fn check_digit(digits: &[u32]) -> u32 {
    #[allow(clippy::cast_possible_truncation)]
    let len = digits.len() as u32;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, &d)| {
            #[allow(clippy::cast_possible_truncation)]
            let weight = len + 1 - i as u32;
            d * weight
        })
        .sum();
    let rem = (sum * 10) % 11;
    if rem == 10 { 0 } else { rem }
}
