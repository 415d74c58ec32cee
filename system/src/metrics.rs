/// Converts physical pixels to dp. A zero density leaves the value as is.
#[must_use]
pub fn px_to_dp(px: f64, density: f64) -> f64 {
    if density > 0.0 { px / density } else { px }
}

/// Converts dp to physical pixels, rounding to the nearest pixel.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn dp_to_px(dp: f64, density: f64) -> u32 {
    dp.mul_add(density, 0.5).max(0.0) as u32
}

/// Rounds to one decimal place.
#[must_use]
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        assert!((px_to_dp(63.0, 2.625) - 24.0).abs() < 1e-9);
        assert!((px_to_dp(10.0, 0.0) - 10.0).abs() < 1e-9);
        assert_eq!(dp_to_px(24.0, 2.625), 63);
        assert!((round_one_decimal(38.095) - 38.1).abs() < 1e-9);
    }
}
