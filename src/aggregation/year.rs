//! Assembling one calendar year of daily totals.

use chrono::NaiveDate;
use ndarray::{Array3, Axis, Zip};
use tracing::{debug, info, warn};

use super::temporal::TemporalReducer;
use crate::data_source::DaySource;
use crate::errors::{PrecipError, Result};
use crate::raster::{RasterGrid, TimeIndexedField};

/// Default units of a daily precipitation total
pub const DAILY_UNITS: &str = "mm/day";

/// Proleptic Gregorian leap-year rule
#[must_use]
pub const fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Number of days in `year`
#[must_use]
pub const fn day_count(year: i32) -> usize {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

/// Builds a (day-of-year × lat × lon) field of daily sums for one year.
///
/// Missing days are left as all-zero slices rather than no-data, so annual
/// totals computed from the result are biased low when days are absent.
#[derive(Debug, Clone)]
pub struct YearAssembler {
    year: i32,
    units: String,
}

impl YearAssembler {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            units: DAILY_UNITS.to_string(),
        }
    }

    /// Fold every day of the year through [`TemporalReducer`].
    ///
    /// The coordinate grid of January 1st is the reference for the whole year.
    ///
    /// # Errors
    ///
    /// - [`PrecipError::MissingReferenceGrid`] when January 1st is absent
    /// - [`PrecipError::ShapeMismatch`] when a later day uses a different grid
    /// - any error raised by the day source while reading a present day
    pub fn assemble(&self, source: &dyn DaySource) -> Result<TimeIndexedField> {
        let first_day = NaiveDate::from_ymd_opt(self.year, 1, 1).ok_or_else(|| {
            PrecipError::InvalidConfig(format!("year {} is out of range", self.year))
        })?;
        let days = day_count(self.year);

        let reference_slices = source
            .fetch(first_day)?
            .filter(|slices| !slices.is_empty())
            .ok_or(PrecipError::MissingReferenceGrid { year: self.year })?;
        let reference = TemporalReducer::reduce(&reference_slices)?;
        let (n_lat, n_lon) = reference.shape();

        info!(
            year = self.year,
            days,
            shape = ?(n_lat, n_lon),
            "🚀 Assembling daily totals"
        );

        let mut data = Array3::<f32>::zeros((days, n_lat, n_lon));
        place_day(&mut data, 0, &reference);

        let mut missing = Vec::new();
        for (offset, date) in first_day.iter_days().take(days).enumerate().skip(1) {
            let slices = match source.fetch(date)? {
                Some(slices) if !slices.is_empty() => slices,
                Some(_) => {
                    warn!(%date, "day file holds no sub-daily slices, leaving day as zero");
                    missing.push(date);
                    continue;
                }
                None => {
                    missing.push(date);
                    continue;
                }
            };

            let daily = TemporalReducer::reduce(&slices)?;
            if !daily.shares_grid_with(&reference) {
                return Err(PrecipError::shape_mismatch(format!(
                    "{date} does not share the coordinate grid of {first_day}"
                )));
            }

            debug!(%date, slices = slices.len(), "day reduced");
            place_day(&mut data, offset, &daily);
        }

        if !missing.is_empty() {
            warn!(
                year = self.year,
                missing = missing.len(),
                first_missing = %missing[0],
                "⚠ days without source data were filled with zero"
            );
        }

        let time = (1..=days as i32).collect();
        TimeIndexedField::new(
            data,
            time,
            reference.lat().clone(),
            reference.lon().clone(),
            self.units.clone(),
        )
    }
}

/// Copy one day's totals into its slot; no-data cells count as zero rainfall.
fn place_day(data: &mut Array3<f32>, offset: usize, daily: &RasterGrid) {
    Zip::from(data.index_axis_mut(Axis(0), offset))
        .and(daily.data())
        .for_each(|slot, &value| {
            *slot = if daily.is_no_data(value) { 0.0 } else { value };
        });
}
