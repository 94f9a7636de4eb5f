//! Data source abstraction for daily raw inputs
//!
//! The year assembler only needs "give me the sub-daily rasters for this date, if
//! any". Keeping that behind a trait lets the NetCDF reader and in-memory test
//! sources be swapped freely.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::errors::Result;
use crate::raster::RasterGrid;

/// Capability to look up the sub-daily rasters of one calendar day.
pub trait DaySource {
    /// Returns `Ok(None)` when the day's raw file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error when a present file cannot be read.
    fn fetch(&self, date: NaiveDate) -> Result<Option<Vec<RasterGrid>>>;
}

/// Day source backed by an in-memory map, handy for tests and small replays.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDaySource {
    days: HashMap<NaiveDate, Vec<RasterGrid>>,
}

impl InMemoryDaySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate, slices: Vec<RasterGrid>) {
        self.days.insert(date, slices);
    }

    #[must_use]
    pub fn with_day(mut self, date: NaiveDate, slices: Vec<RasterGrid>) -> Self {
        self.insert(date, slices);
        self
    }
}

impl DaySource for InMemoryDaySource {
    fn fetch(&self, date: NaiveDate) -> Result<Option<Vec<RasterGrid>>> {
        Ok(self.days.get(&date).cloned())
    }
}
