//! # Lenient Parsing Helpers
//!
//! Small parsers for the free-text fields carried by medicine and pharmacy
//! descriptors. None of them fail loudly: callers get `None` and apply the
//! documented default (1 unit, zero price, slowest-unknown delivery).
//!
//! ```text
//! "20 tablets"      ──► first_integer      ──► Some(20)
//! "30-45 mins"      ──► delivery_upper_bound ──► Some(45)
//! "12.5"            ──► decimal_to_cents   ──► Some(1250)
//! ```

/// Iterates over every run of ASCII digits in `s`, in order.
///
/// Runs too long for `u64` are skipped.
pub fn integer_tokens(s: &str) -> impl Iterator<Item = u64> + '_ {
    s.split(|c: char| !c.is_ascii_digit())
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse::<u64>().ok())
}

/// Returns the first integer found in a pack-size descriptor.
///
/// ## Example
/// ```rust
/// use medsel_core::parse::first_integer;
///
/// assert_eq!(first_integer("20 tablets"), Some(20));
/// assert_eq!(first_integer("Strip of 10"), Some(10));
/// assert_eq!(first_integer("bottle"), None);
/// ```
pub fn first_integer(s: &str) -> Option<u64> {
    integer_tokens(s).next()
}

/// Units contained in one pack. Unparseable or zero sizes count as 1.
pub fn units_per_pack(pack_size: &str) -> i64 {
    first_integer(pack_size)
        .and_then(|n| i64::try_from(n).ok())
        .filter(|n| *n > 0)
        .unwrap_or(1)
}

/// Upper bound of an "X-Y mins" delivery estimate.
///
/// A single number ("45 mins") is its own upper bound.
pub fn delivery_upper_bound(delivery_time: &str) -> Option<u64> {
    integer_tokens(delivery_time).last()
}

/// Parses a decimal amount into minor units, rounding half up on the third
/// decimal place.
///
/// Accepts an optional leading sign and a single `.`; a leading currency
/// symbol and surrounding whitespace are ignored. Amounts outside the `i64`
/// range yield `None`.
pub fn decimal_to_cents(raw: &str) -> Option<i64> {
    let trimmed = raw
        .trim()
        .trim_start_matches(|c: char| !c.is_ascii_digit() && c != '-' && c != '.');
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let (whole, frac) = match body.split_once('.') {
        Some((w, f)) => (w, f),
        None => (body, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let digits: Vec<i64> = frac
        .chars()
        .take(3)
        .map(|c| i64::from(c as u8 - b'0'))
        .collect();
    let tenths = digits.first().copied().unwrap_or(0);
    let hundredths = digits.get(1).copied().unwrap_or(0);
    let round_up = digits.get(2).copied().unwrap_or(0) >= 5;

    let cents = whole
        .checked_mul(100)?
        .checked_add(tenths * 10 + hundredths)?
        .checked_add(i64::from(round_up))?;
    Some(if negative { -cents } else { cents })
}

/// Reads an integer from a loosely-typed JSON value.
///
/// Numbers are truncated toward zero; strings use their first integer token.
pub fn json_integer(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| first_integer(s).and_then(|n| i64::try_from(n).ok()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_units_per_pack() {
        assert_eq!(units_per_pack("20 tablets"), 20);
        assert_eq!(units_per_pack("1x30 capsules"), 1);
        assert_eq!(units_per_pack("syrup"), 1);
        assert_eq!(units_per_pack("0 tablets"), 1);
    }

    #[test]
    fn test_delivery_upper_bound() {
        assert_eq!(delivery_upper_bound("30-45 mins"), Some(45));
        assert_eq!(delivery_upper_bound("60 mins"), Some(60));
        assert_eq!(delivery_upper_bound("same day"), None);
    }

    #[test]
    fn test_decimal_to_cents() {
        assert_eq!(decimal_to_cents("12"), Some(1200));
        assert_eq!(decimal_to_cents("12.5"), Some(1250));
        assert_eq!(decimal_to_cents(" $9.99 "), Some(999));
        assert_eq!(decimal_to_cents("0.125"), Some(13));
        assert_eq!(decimal_to_cents("-3.10"), Some(-310));
        assert_eq!(decimal_to_cents(".5"), Some(50));
        assert_eq!(decimal_to_cents("abc"), None);
        assert_eq!(decimal_to_cents("1.2.3"), None);
        assert_eq!(decimal_to_cents(""), None);
    }

    #[test]
    fn test_decimal_to_cents_out_of_range() {
        assert_eq!(decimal_to_cents("92233720368547758.07"), Some(i64::MAX));
        assert_eq!(decimal_to_cents("92233720368547758.99"), None);
        assert_eq!(decimal_to_cents("92233720368547758.079"), None);
        assert_eq!(decimal_to_cents("-92233720368547758.07"), Some(-i64::MAX));
        assert_eq!(decimal_to_cents("99999999999999999999"), None);
    }

    #[test]
    fn test_json_integer() {
        assert_eq!(json_integer(&json!(30)), Some(30));
        assert_eq!(json_integer(&json!(2.9)), Some(2));
        assert_eq!(json_integer(&json!("14")), Some(14));
        assert_eq!(json_integer(&json!("14 tablets")), Some(14));
        assert_eq!(json_integer(&json!(true)), None);
    }
}
