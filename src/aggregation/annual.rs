//! Annual totals from a yearly field.

use ndarray::Array3;
use tracing::info;

use super::temporal::TemporalReducer;
use crate::errors::Result;
use crate::raster::{RasterGrid, TimeIndexedField, NO_DATA};

/// Default units of an annual precipitation total
pub const ANNUAL_UNITS: &str = "mm/year";

/// Collapses a day-indexed field into one annual total.
#[derive(Debug, Clone)]
pub struct AnnualAggregator {
    units: String,
}

impl Default for AnnualAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnualAggregator {
    pub fn new() -> Self {
        Self {
            units: ANNUAL_UNITS.to_string(),
        }
    }

    /// Sum all slices of `field` and report the largest finite total.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PrecipError::EmptyField`] when `field` has no slices.
    pub fn aggregate(&self, field: &TimeIndexedField) -> Result<(RasterGrid, f32)> {
        let total = TemporalReducer::reduce_field(field)?.with_units(self.units.clone());
        let max_value = max_finite(&total);

        info!(
            slices = field.len(),
            max_value,
            units = %self.units,
            "⚡ Annual total computed"
        );

        Ok((total, max_value))
    }

    /// Wrap an annual total as a one-slice field keyed by `year`.
    ///
    /// # Errors
    ///
    /// Fails only if the grid's own shape is inconsistent with its axes.
    pub fn into_field(total: &RasterGrid, year: i32) -> Result<TimeIndexedField> {
        let (n_lat, n_lon) = total.shape();
        let data: Array3<f32> = total.data().to_owned().into_shape((1, n_lat, n_lon))?;
        Ok(TimeIndexedField::new(
            data,
            vec![year],
            total.lat().clone(),
            total.lon().clone(),
            total.units(),
        )?
        .with_fill_value(total.fill_value()))
    }
}

/// Largest value over the grid's finite, non-fill cells; [`NO_DATA`] if there are none.
pub fn max_finite(grid: &RasterGrid) -> f32 {
    grid.data()
        .iter()
        .copied()
        .filter(|&v| !grid.is_no_data(v))
        .fold(None, |acc: Option<f32>, v| Some(acc.map_or(v, |m| m.max(v))))
        .unwrap_or(NO_DATA)
}
