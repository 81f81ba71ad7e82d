//! Theoretical Moore's-Law projection used as the reference point for every
//! prediction.

/// Year the doubling curve is anchored at (Intel 4004).
pub const BASE_YEAR: f64 = 1971.0;

/// Transistor count at the anchor year.
pub const BASE_COUNT: f64 = 2300.0;

/// Transistor count the doubling-every-two-years curve reaches in `year`.
pub fn projection(year: f64) -> f64 {
    BASE_COUNT * 2f64.powf((year - BASE_YEAR) / 2.0)
}

/// Percentage deviation of a predicted count from the projection.
pub fn deviation_pct(prediction_count: f64, projection: f64) -> f64 {
    (prediction_count - projection) / projection * 100.0
}

/// Human-readable comparison line. The test is a strict `> 0`, so a deviation
/// of exactly zero reads "Below"; the deployed front end relies on this exact
/// wording.
pub fn comparison_text(deviation_pct: f64) -> String {
    let side = if deviation_pct > 0.0 { "Above" } else { "Below" };
    format!("{:.1}% {} Moore's Law", deviation_pct.abs(), side)
}
