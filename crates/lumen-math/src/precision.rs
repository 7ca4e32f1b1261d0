//! Directed rounding from float64 to float32.
//!
//! A plain `as f32` cast rounds to nearest, which can move a bound inward.
//! Bounds stored at float32 precision must only ever grow, so minimum
//! corners are rounded toward negative infinity and maximum corners toward
//! positive infinity.

/// Next representable `f32` above `x`.
///
/// `+inf` and NaN are returned unchanged.
pub fn next_up(x: f32) -> f32 {
    if x.is_nan() || x == f32::INFINITY {
        return x;
    }
    if x == 0.0 {
        // Covers both +0.0 and -0.0.
        return f32::from_bits(1);
    }
    let bits = x.to_bits();
    if x > 0.0 {
        f32::from_bits(bits + 1)
    } else {
        f32::from_bits(bits - 1)
    }
}

/// Next representable `f32` below `x`.
///
/// `-inf` and NaN are returned unchanged.
pub fn next_down(x: f32) -> f32 {
    -next_up(-x)
}

/// Convert to `f32`, rounding toward negative infinity.
///
/// The result is always `<= value` when compared in float64.
pub fn round_down_f32(value: f64) -> f32 {
    let f = value as f32;
    if f as f64 > value {
        next_down(f)
    } else {
        f
    }
}

/// Convert to `f32`, rounding toward positive infinity.
///
/// The result is always `>= value` when compared in float64.
pub fn round_up_f32(value: f64) -> f32 {
    let f = value as f32;
    if (f as f64) < value {
        next_up(f)
    } else {
        f
    }
}
