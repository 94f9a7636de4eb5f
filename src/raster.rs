//! Raster data model
//!
//! A [`RasterGrid`] is one 2D time slice over a lat/lon grid; a [`TimeIndexedField`]
//! stacks slices that share the same coordinate vectors along a leading time axis.
//! Coordinate vectors are reference counted so every slice of a dataset points at
//! the same lat/lon values.

use std::ops::Deref;
use std::sync::Arc;

use ndarray::{Array2, Array3, ArrayView2, Axis};

use crate::errors::{PrecipError, Result};

/// Marker written into cells that received no contributing source data.
pub const NO_DATA: f32 = f32::NAN;

/// Ordered, monotonic coordinate values in degrees for one grid axis
#[derive(Debug, Clone)]
pub struct CoordinateAxis(Arc<[f64]>);

impl CoordinateAxis {
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self(Arc::from(values.into()))
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Smallest and largest coordinate, `None` for an empty axis
    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.0.iter().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// True when both axes hold the same coordinates
    pub fn same_as(&self, other: &CoordinateAxis) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0[..] == other.0[..]
    }
}

impl Deref for CoordinateAxis {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

impl From<Vec<f64>> for CoordinateAxis {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

/// One time slice of a gridded field
#[derive(Debug, Clone)]
pub struct RasterGrid {
    data: Array2<f32>,
    lat: CoordinateAxis,
    lon: CoordinateAxis,
    units: String,
    fill_value: Option<f32>,
}

impl RasterGrid {
    /// Create a grid, checking that `data` is shaped `(lat.len(), lon.len())`
    pub fn new(
        data: Array2<f32>,
        lat: CoordinateAxis,
        lon: CoordinateAxis,
        units: impl Into<String>,
    ) -> Result<Self> {
        if data.dim() != (lat.len(), lon.len()) {
            return Err(PrecipError::shape_mismatch(format!(
                "raster data has shape {:?} but axes are ({}, {})",
                data.shape(),
                lat.len(),
                lon.len()
            )));
        }

        Ok(Self {
            data,
            lat,
            lon,
            units: units.into(),
            fill_value: None,
        })
    }

    #[must_use]
    pub fn with_fill_value(mut self, fill_value: Option<f32>) -> Self {
        self.fill_value = fill_value;
        self
    }

    #[must_use]
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn lat(&self) -> &CoordinateAxis {
        &self.lat
    }

    pub fn lon(&self) -> &CoordinateAxis {
        &self.lon
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn fill_value(&self) -> Option<f32> {
        self.fill_value
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Whether `value` counts as no-data on this grid
    pub fn is_no_data(&self, value: f32) -> bool {
        is_no_data(value, self.fill_value)
    }

    /// True when both grids sit on identical coordinate vectors
    pub fn shares_grid_with(&self, other: &RasterGrid) -> bool {
        self.lat.same_as(&other.lat) && self.lon.same_as(&other.lon)
    }
}

/// Non-finite values and the dataset's fill value both mean "no data".
pub fn is_no_data(value: f32, fill_value: Option<f32>) -> bool {
    !value.is_finite() || fill_value == Some(value)
}

/// Stack of rasters sharing one grid, keyed by day-of-year or calendar year
#[derive(Debug, Clone)]
pub struct TimeIndexedField {
    data: Array3<f32>,
    time: Vec<i32>,
    lat: CoordinateAxis,
    lon: CoordinateAxis,
    units: String,
    fill_value: Option<f32>,
}

impl TimeIndexedField {
    pub fn new(
        data: Array3<f32>,
        time: Vec<i32>,
        lat: CoordinateAxis,
        lon: CoordinateAxis,
        units: impl Into<String>,
    ) -> Result<Self> {
        let (nt, ny, nx) = data.dim();
        if nt != time.len() || ny != lat.len() || nx != lon.len() {
            return Err(PrecipError::shape_mismatch(format!(
                "field data has shape {:?} but axes are (time={}, lat={}, lon={})",
                data.shape(),
                time.len(),
                lat.len(),
                lon.len()
            )));
        }

        Ok(Self {
            data,
            time,
            lat,
            lon,
            units: units.into(),
            fill_value: None,
        })
    }

    #[must_use]
    pub fn with_fill_value(mut self, fill_value: Option<f32>) -> Self {
        self.fill_value = fill_value;
        self
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn time(&self) -> &[i32] {
        &self.time
    }

    pub fn lat(&self) -> &CoordinateAxis {
        &self.lat
    }

    pub fn lon(&self) -> &CoordinateAxis {
        &self.lon
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn fill_value(&self) -> Option<f32> {
        self.fill_value
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn slice_view(&self, index: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(0), index)
    }

    /// Copy one time slice out as a standalone raster
    pub fn slice(&self, index: usize) -> RasterGrid {
        RasterGrid {
            data: self.slice_view(index).to_owned(),
            lat: self.lat.clone(),
            lon: self.lon.clone(),
            units: self.units.clone(),
            fill_value: self.fill_value,
        }
    }

    pub fn slices(&self) -> impl Iterator<Item = RasterGrid> + '_ {
        (0..self.len()).map(move |i| self.slice(i))
    }
}
