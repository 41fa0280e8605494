pub mod settings;
pub mod stats;
pub mod trip;

/// Rounds to two decimal places, the precision every derived trip field is stored with.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
