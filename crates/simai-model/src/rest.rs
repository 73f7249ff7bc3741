//! Rest lengths between measures, expressed the way the notation counts them.

use fraction::Fraction;

use crate::error::{Result, SimaiError};

/// Largest denominator written for durations and rests.
pub const MAX_DENOMINATOR: u64 = 1000;

/// Distance between two measures as `whole` full measures plus `amount`
/// beats of a `divisor`-beat measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rest {
    pub whole: u64,
    pub divisor: u64,
    pub amount: u64,
}

pub fn rest(current: f64, next: f64) -> Result<Option<Rest>> {
    rest_with_limit(current, next, MAX_DENOMINATOR)
}

/// Returns `None` when both measures are the same.
pub fn rest_with_limit(current: f64, next: f64, max_denominator: u64) -> Result<Option<Rest>> {
    for value in [current, next] {
        if !value.is_finite() {
            return Err(SimaiError::OutOfRange {
                what: "rest boundary",
                value,
            });
        }
    }
    if next < current {
        return Err(SimaiError::OutOfOrder { current, next });
    }
    if next == current {
        return Ok(None);
    }

    let difference = next - current;
    let whole = difference.trunc();
    let (amount, divisor) = fraction_parts(&limit_denominator(difference - whole, max_denominator));
    Ok(Some(Rest {
        whole: whole as u64,
        divisor,
        amount,
    }))
}

/// Closest fraction to `value` whose denominator does not exceed `max_denominator`.
///
/// Works on the exact binary value of the float, so `0.1` comes out as `1/10`
/// and `1.0 / 3.0` as `1/3`.
pub fn limit_denominator(value: f64, max_denominator: u64) -> Fraction {
    if value < 0.0 {
        return -limit_denominator(-value, max_denominator);
    }
    if !value.is_finite() {
        return Fraction::new(0u64, 1u64);
    }

    // Shifting by an integer keeps the best approximation, so only the
    // fractional part goes through the continued fraction.
    let whole = value.trunc();
    let (numer, denom) = exact_ratio(value - whole);
    let (p, q) = best_rational(numer, denom, u128::from(max_denominator.max(1)));
    let q = q as u64;
    Fraction::new(whole as u64 * q + p as u64, q)
}

/// `(numerator, denominator)` of a non-negative fraction.
pub fn fraction_parts(f: &Fraction) -> (u64, u64) {
    match (f.numer(), f.denom()) {
        (Some(n), Some(d)) if *d != 0 => (*n, *d),
        _ => (0, 1),
    }
}

/// Exact `mantissa / 2^k` form of a float in `[0, 1)`.
///
/// `k` is capped at 64; the bits dropped are far below anything a
/// denominator of a few thousand can resolve.
fn exact_ratio(x: f64) -> (u128, u128) {
    if x <= 0.0 {
        return (0, 1);
    }
    let bits = x.to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as i32;
    let fraction = u128::from(bits & ((1u64 << 52) - 1));
    let (mut mantissa, mut shift) = if exponent == 0 {
        (fraction, 1074)
    } else {
        (fraction | (1 << 52), 1075 - exponent)
    };
    while mantissa & 1 == 0 && shift > 0 {
        mantissa >>= 1;
        shift -= 1;
    }
    if shift > 64 {
        mantissa >>= shift - 64;
        shift = 64;
    }
    (mantissa, 1u128 << shift)
}

fn best_rational(numer: u128, denom: u128, max_denominator: u128) -> (u128, u128) {
    if denom <= max_denominator {
        return (numer, denom);
    }

    let (mut p0, mut q0, mut p1, mut q1) = (0u128, 1u128, 1u128, 0u128);
    let (mut n, mut d) = (numer, denom);
    while d != 0 {
        let a = n / d;
        let q2 = q0 + a * q1;
        if q2 > max_denominator {
            break;
        }
        (p0, q0, p1, q1) = (p1, q1, p0 + a * p1, q2);
        (n, d) = (d, n - a * d);
    }

    let k = (max_denominator - q0) / q1;
    let (p_semi, q_semi) = (p0 + k * p1, q0 + k * q1);
    // |p/q - numer/denom| compared without division
    let error = |p: u128, q: u128| (p * denom).abs_diff(numer * q);
    if error(p1, q1) * q_semi <= error(p_semi, q_semi) * q1 {
        (p1, q1)
    } else {
        (p_semi, q_semi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_half_measure() {
        assert_eq!(
            rest(1.0, 1.5).unwrap(),
            Some(Rest {
                whole: 0,
                divisor: 2,
                amount: 1
            })
        );
    }

    #[test]
    fn test_rest_whole_measure() {
        assert_eq!(
            rest(1.0, 2.0).unwrap(),
            Some(Rest {
                whole: 1,
                divisor: 1,
                amount: 0
            })
        );
    }

    #[test]
    fn test_rest_mixed() {
        assert_eq!(
            rest(1.25, 3.5).unwrap(),
            Some(Rest {
                whole: 2,
                divisor: 4,
                amount: 1
            })
        );
    }

    #[test]
    fn test_rest_equal_measures() {
        assert_eq!(rest(2.5, 2.5).unwrap(), None);
    }

    #[test]
    fn test_rest_out_of_order() {
        assert_eq!(
            rest(2.0, 1.5),
            Err(SimaiError::OutOfOrder {
                current: 2.0,
                next: 1.5
            })
        );
    }

    #[test]
    fn test_rest_to_infinity() {
        assert!(matches!(
            rest(1.0, f64::INFINITY),
            Err(SimaiError::OutOfRange { .. })
        ));
        assert!(rest(f64::NAN, 2.0).is_err());
    }

    #[test]
    fn test_rest_rounded_thirds() {
        // 1.3333 -> 1.6667 is a rounded third
        let r = rest(1.3333, 1.6667).unwrap().unwrap();
        assert_eq!((r.whole, r.divisor, r.amount), (0, 3, 1));
    }

    #[test]
    fn test_limit_denominator() {
        assert_eq!(limit_denominator(0.1, 1000), Fraction::new(1u64, 10u64));
        assert_eq!(limit_denominator(1.0 / 3.0, 1000), Fraction::new(1u64, 3u64));
        assert_eq!(limit_denominator(std::f64::consts::PI, 10), Fraction::new(22u64, 7u64));
        assert_eq!(limit_denominator(std::f64::consts::PI, 100), Fraction::new(311u64, 99u64));
        assert_eq!(limit_denominator(std::f64::consts::PI, 1000), Fraction::new(355u64, 113u64));
        assert_eq!(limit_denominator(2.75, 1000), Fraction::new(11u64, 4u64));
        assert_eq!(limit_denominator(0.0, 1000), Fraction::new(0u64, 1u64));
    }

    #[test]
    fn test_limit_denominator_snaps_near_one() {
        assert_eq!(limit_denominator(0.99999, 1000), Fraction::new(1u64, 1u64));
    }

    #[test]
    fn test_fraction_parts() {
        assert_eq!(fraction_parts(&Fraction::new(3u64, 8u64)), (3, 8));
        assert_eq!(fraction_parts(&Fraction::new(4u64, 8u64)), (1, 2));
    }
}
