use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_FUEL_PRICE: f64 = 1.65;
pub const DEFAULT_AVERAGE_CONSUMPTION: f64 = 6.5;

/// Rates used to cost newly completed trips.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Currency per liter.
    pub fuel_price: f64,
    /// Liters per 100 km.
    pub average_consumption: f64,
}

impl AppSettings {
    pub fn new(fuel_price: f64, average_consumption: f64) -> Result<Self, AppError> {
        ensure_positive(fuel_price, "fuel price")?;
        ensure_positive(average_consumption, "average consumption")?;
        Ok(Self {
            fuel_price,
            average_consumption,
        })
    }

    pub fn is_valid(&self) -> bool {
        Self::new(self.fuel_price, self.average_consumption).is_ok()
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            fuel_price: DEFAULT_FUEL_PRICE,
            average_consumption: DEFAULT_AVERAGE_CONSUMPTION,
        }
    }
}

fn ensure_positive(value: f64, field: &str) -> Result<(), AppError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{field} must be a positive number"
        )))
    }
}
