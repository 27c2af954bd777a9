pub mod net;
pub mod pagination;
pub mod text;
pub mod time;

/// Round to two decimals for percentages and averages.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
