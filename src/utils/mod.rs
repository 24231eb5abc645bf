/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Round to one decimal place, the precision used for displayed totals.
pub fn round1(value: f64) -> f64 {
    round_to(value, 1)
}

/// `part / whole` as a percentage, 0 when `whole` is zero.
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 || !whole.is_finite() {
        return 0.0;
    }
    (part / whole * 100.0).clamp(0.0, 100.0)
}

/// Hours from `from` until `to`; negative when `to` is earlier.
pub fn hours_between(from: chrono::DateTime<chrono::Utc>, to: chrono::DateTime<chrono::Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 3_600_000.0
}
