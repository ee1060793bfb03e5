//! Shared numerical primitives.

/// Primary scalar type used across the crate.
pub type Scalar = f64;

/// Greatest common divisor of two unsigned integers.
#[must_use]
pub const fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Checked integer power.
#[must_use]
pub const fn checked_pow(base: u128, exp: u32) -> Option<u128> {
    base.checked_pow(exp)
}

/// Returns `r` such that `r^n == value` exactly, if one exists.
#[must_use]
pub fn exact_root(value: u128, n: u32) -> Option<u128> {
    match (value, n) {
        (_, 0) => None,
        (0 | 1, _) | (_, 1) => Some(value),
        _ => {
            let estimate = (value as Scalar).powf(1.0 / Scalar::from(n)).round() as u128;
            // Float rounding may land one off for large values.
            let lo = estimate.saturating_sub(1);
            (lo..=estimate + 1).find(|&candidate| checked_pow(candidate, n) == Some(value))
        }
    }
}

/// Approximates `x` by a fraction `p / q` with `q <= max_denominator`.
///
/// Returns `None` when no such fraction lies within `1e-9` of `x`.
#[must_use]
pub fn rationalize(x: Scalar, max_denominator: u32) -> Option<(i64, u32)> {
    if !x.is_finite() {
        return None;
    }
    (1..=max_denominator).find_map(|q| {
        let scaled = x * Scalar::from(q);
        let p = scaled.round();
        ((scaled - p).abs() < 1.0e-9 && p.abs() < i64::MAX as Scalar).then(|| (p as i64, q))
    })
}

/// Relative comparison used by unit lookups and tests.
#[inline]
#[must_use]
pub fn relative_eq(a: Scalar, b: Scalar, max_relative: Scalar) -> bool {
    if a == b {
        return true;
    }
    let scale = a.abs().max(b.abs());
    (a - b).abs() <= max_relative * scale
}

/// Formats a scalar with up to `digits` significant digits, trimming trailing zeros.
#[must_use]
pub fn format_significant(value: Scalar, digits: usize) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{value}");
    }
    let magnitude = value.abs().log10().floor() as i32;
    if !(-5..=15).contains(&magnitude) {
        return format!("{:.*e}", digits.saturating_sub(1), value);
    }
    let decimals = (digits as i32 - 1 - magnitude).max(0) as usize;
    let text = format!("{value:.decimals$}");
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}
