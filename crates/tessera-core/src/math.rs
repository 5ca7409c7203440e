//! Fixed-point integer helpers shared by the reward curves and the reward engine.
//!
//! All results are floored. There is no floating point anywhere in this
//! module, so outputs are bit-reproducible on every platform.
use crate::constants::PERCENT_100;
use crate::error::MathError;
use crate::types::TimeSpan;

const LOW_64: u128 = u64::MAX as u128;

/// Index of the most significant set bit. Zero maps to 0.
pub fn find_msb(x: u128) -> u8 {
    if x == 0 {
        0
    } else {
        (127 - x.leading_zeros()) as u8
    }
}

/// Approximate integer square root by halving the exponent.
///
/// The result keeps the most significant bit of the true root exact and
/// linearly interpolates the mantissa, so it is within a factor of two of
/// `sqrt(x)`. Perfect powers of four come out exact. Only suitable for
/// relative weighting.
pub fn approx_sqrt(x: u128) -> u64 {
    if x == 0 {
        return 0;
    }
    let msb_x = u32::from(find_msb(x));
    let msb_z = msb_x >> 1;

    let msb_x_bit: u128 = 1u128 << msb_x;
    let msb_z_bit: u64 = 1u64 << msb_z;

    let mantissa_x = x & (msb_x_bit - 1);
    let mantissa_z_hi = if msb_x & 1 == 1 { msb_z_bit } else { 0 };
    // mantissa_x < 2^msb_x, so the shifted value is below 2^msb_z and fits.
    let mantissa_z_lo = (mantissa_x >> (msb_x - msb_z)) as u64;
    let mantissa_z = (mantissa_z_hi | mantissa_z_lo) >> 1;

    msb_z_bit | mantissa_z
}

/// Full 256-bit product of two `u128` values as `(high, low)`.
pub fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    let (a1, a0) = (a >> 64, a & LOW_64);
    let (b1, b0) = (b >> 64, b & LOW_64);

    let p00 = a0 * b0;
    let p01 = a0 * b1;
    let p10 = a1 * b0;
    let p11 = a1 * b1;

    let mid = (p00 >> 64) + (p01 & LOW_64) + (p10 & LOW_64);
    let low = (p00 & LOW_64) | ((mid & LOW_64) << 64);
    let high = p11 + (p01 >> 64) + (p10 >> 64) + (mid >> 64);
    (high, low)
}

/// `floor(a * b / divisor)` with a 256-bit intermediate product.
///
/// # Errors
///
/// - [`MathError::DivisionByZero`] if `divisor` is zero.
/// - [`MathError::Overflow`] if the quotient does not fit in `u128`.
pub fn mul_div(a: u128, b: u128, divisor: u128) -> Result<u128, MathError> {
    if divisor == 0 {
        return Err(MathError::DivisionByZero);
    }
    if let Some(product) = a.checked_mul(b) {
        return Ok(product / divisor);
    }

    let (high, low) = widening_mul(a, b);
    if high >= divisor {
        return Err(MathError::Overflow);
    }

    // Restoring long division of (high:low) by divisor. The remainder stays
    // below divisor; `carry` tracks the bit shifted out of a 128-bit register.
    let mut remainder = high;
    let mut quotient: u128 = 0;
    for i in (0..128).rev() {
        let carry = remainder >> 127;
        remainder = (remainder << 1) | ((low >> i) & 1);
        quotient <<= 1;
        if carry == 1 || remainder >= divisor {
            remainder = remainder.wrapping_sub(divisor);
            quotient |= 1;
        }
    }
    Ok(quotient)
}

/// `value * percent / PERCENT_100`, floored.
pub fn apply_percent(value: u128, percent: u32) -> Result<u128, MathError> {
    mul_div(value, u128::from(percent), u128::from(PERCENT_100))
}

/// Linearly decay an accumulator: `value - value * elapsed / window`.
///
/// Both spans are taken in whole seconds. Once `elapsed` reaches `window`
/// the accumulator is fully decayed to zero.
pub fn decay_linear(value: u128, elapsed: TimeSpan, window: TimeSpan) -> Result<u128, MathError> {
    let window_secs = window.as_secs();
    if window_secs <= 0 {
        return Err(MathError::DivisionByZero);
    }
    let elapsed_secs = elapsed.as_secs().clamp(0, window_secs);
    let decayed = mul_div(value, elapsed_secs as u128, window_secs as u128)?;
    Ok(value - decayed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn msb_of_small_values() {
        assert_eq!(find_msb(0), 0);
        assert_eq!(find_msb(1), 0);
        assert_eq!(find_msb(2), 1);
        assert_eq!(find_msb(255), 7);
        assert_eq!(find_msb(1u128 << 64), 64);
        assert_eq!(find_msb(u128::MAX), 127);
    }

    #[test]
    fn approx_sqrt_known_values() {
        assert_eq!(approx_sqrt(0), 0);
        assert_eq!(approx_sqrt(1), 1);
        assert_eq!(approx_sqrt(2), 1);
        assert_eq!(approx_sqrt(4), 2);
        assert_eq!(approx_sqrt(9), 3);
        assert_eq!(approx_sqrt(16), 4);
        assert_eq!(approx_sqrt(100), 10);
        assert_eq!(approx_sqrt(1u128 << 100), 1u64 << 50);
    }

    #[test]
    fn mul_div_wide_product() {
        assert_eq!(mul_div(u128::MAX, u128::MAX, u128::MAX), Ok(u128::MAX));
        assert_eq!(mul_div(1u128 << 100, 1u128 << 100, 1u128 << 90), Ok(1u128 << 110));
        assert_eq!(mul_div(u128::MAX, 2, 1), Err(MathError::Overflow));
        assert_eq!(mul_div(1, 1, 0), Err(MathError::DivisionByZero));
    }

    #[test]
    fn decay_clamps_at_window() {
        let day = TimeSpan::days(1);
        assert_eq!(decay_linear(1000, TimeSpan::ZERO, day), Ok(1000));
        assert_eq!(decay_linear(1000, TimeSpan::hours(12), day), Ok(500));
        assert_eq!(decay_linear(1000, TimeSpan::days(3), day), Ok(0));
        assert_eq!(decay_linear(1000, day, TimeSpan::ZERO), Err(MathError::DivisionByZero));
    }

    #[test]
    fn percent_helper() {
        assert_eq!(apply_percent(1000, 12_500), Ok(1250));
        assert_eq!(apply_percent(3, 5_000), Ok(1));
    }

    proptest! {
        #[test]
        fn approx_sqrt_within_factor_two(x in 1u128..) {
            let z = u128::from(approx_sqrt(x));
            // z^2 <= 2x and (2z)^2 >= x
            let (hi, lo) = widening_mul(z, z);
            let (hi2, lo2) = widening_mul(x, 2);
            prop_assert!((hi, lo) <= (hi2, lo2));
            let (hi4, lo4) = widening_mul(2 * z, 2 * z);
            prop_assert!((hi4, lo4) >= (0, x));
        }

        #[test]
        fn approx_sqrt_is_monotonic(a in 0u128..(1u128 << 120), b in 0u128..(1u128 << 120)) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(approx_sqrt(lo) <= approx_sqrt(hi));
        }

        #[test]
        fn mul_div_matches_narrow_path(a in 0u128..(1u128 << 64), b in 0u128..(1u128 << 64), d in 1u128..) {
            prop_assert_eq!(mul_div(a, b, d), Ok(a * b / d));
        }

        #[test]
        fn widening_mul_low_word_matches_wrapping(a: u128, b: u128) {
            prop_assert_eq!(widening_mul(a, b).1, a.wrapping_mul(b));
        }

        #[test]
        fn decay_matches_closed_form(claims in 0u128..(1u128 << 96), elapsed in 0i64..2_592_000) {
            let window = TimeSpan::days(30);
            let got = decay_linear(claims, TimeSpan::seconds(elapsed), window).unwrap();
            let expected = claims - claims * elapsed as u128 / window.as_secs() as u128;
            prop_assert_eq!(got, expected);
        }
    }
}
