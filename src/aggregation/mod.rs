//! Temporal aggregation of precipitation rasters
//!
//! Sub-daily slices are summed into days, days are stacked into a year, and the
//! year is summed into an annual total.
//!
//! # Organization
//!
//! - [`temporal`]: the element-wise summation shared by every temporal fold
//! - [`year`]: assembling one calendar year of daily totals from a [`DaySource`]
//! - [`annual`]: collapsing a yearly field into one annual total and its maximum
//!
//! [`DaySource`]: crate::data_source::DaySource

pub mod annual;
pub mod temporal;
pub mod year;

pub use annual::{max_finite, AnnualAggregator};
pub use temporal::TemporalReducer;
pub use year::{day_count, is_leap_year, YearAssembler};
