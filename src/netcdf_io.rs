//! NetCDF I/O: daily raw inputs, yearly fields, and result artifacts
//!
//! Raw inputs are one file per day named `YYYYMMDD.nc` holding a sub-daily
//! `(time, lat, lon)` precipitation variable. Results are written with `time`,
//! `lat` and `lon` coordinate variables, a `units` attribute on the result
//! variable and an optional scalar `max_value`.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use ndarray::{Array3, Axis};
use netcdf::{AttributeValue, File, Variable};
use tracing::{debug, info};

use crate::checkpoint::write_atomically;
use crate::data_source::DaySource;
use crate::errors::{PrecipError, Result};
use crate::raster::{CoordinateAxis, RasterGrid, TimeIndexedField, NO_DATA};

/// Hourly precipitation variable of the raw daily files
pub const HOURLY_VARIABLE: &str = "r1h";
/// Daily precipitation variable of the yearly file
pub const DAILY_VARIABLE: &str = "r1d";
/// Annual total variable of the annual-sum file
pub const ANNUAL_VARIABLE: &str = "r1y";

/// Raw file name for a date, e.g. `20150101.nc`
pub fn day_file_name(date: NaiveDate) -> String {
    format!("{}.nc", date.format("%Y%m%d"))
}

fn variable<'f>(file: &'f File, name: &str) -> Result<Variable<'f>> {
    file.variable(name)
        .ok_or_else(|| PrecipError::VariableNotFound {
            var: name.to_string(),
        })
}

fn read_axis(file: &File, name: &str) -> Result<CoordinateAxis> {
    let values = variable(file, name)?.get_values::<f64, _>(..)?;
    Ok(CoordinateAxis::new(values))
}

fn string_attribute(var: &Variable<'_>, name: &str) -> Option<String> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn fill_value_attribute(var: &Variable<'_>) -> Option<f32> {
    match var.attribute("_FillValue")?.value().ok()? {
        AttributeValue::Float(v) => Some(v),
        AttributeValue::Double(v) => Some(v as f32),
        AttributeValue::Short(v) => Some(f32::from(v)),
        _ => None,
    }
}

/// Load a `(time, lat, lon)` variable with its coordinate axes.
fn read_cube(
    file: &File,
    var_name: &str,
    default_units: &str,
) -> Result<(Array3<f32>, CoordinateAxis, CoordinateAxis, String, Option<f32>)> {
    let lat = read_axis(file, "lat")?;
    let lon = read_axis(file, "lon")?;
    let var = variable(file, var_name)?;

    let shape: Vec<usize> = var
        .dimensions()
        .iter()
        .map(netcdf::Dimension::len)
        .collect();
    let (n_time, n_lat, n_lon) = match shape.as_slice() {
        [t, y, x] => (*t, *y, *x),
        [y, x] => (1, *y, *x),
        other => {
            return Err(PrecipError::shape_mismatch(format!(
                "variable '{var_name}' has shape {other:?}, expected (time, lat, lon)"
            )))
        }
    };
    if (n_lat, n_lon) != (lat.len(), lon.len()) {
        return Err(PrecipError::shape_mismatch(format!(
            "variable '{var_name}' is {n_lat}×{n_lon} but lat/lon axes are {}×{}",
            lat.len(),
            lon.len()
        )));
    }

    let values = var.get_values::<f32, _>(..)?;
    let data = Array3::from_shape_vec((n_time, n_lat, n_lon), values)?;
    let units = string_attribute(&var, "units").unwrap_or_else(|| default_units.to_string());

    Ok((data, lat, lon, units, fill_value_attribute(&var)))
}

/// Reads the sub-daily rasters of a day from `{folder}/YYYYMMDD.nc`.
#[derive(Debug, Clone)]
pub struct NetcdfDaySource {
    folder: PathBuf,
    variable: String,
}

impl NetcdfDaySource {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            variable: HOURLY_VARIABLE.to_string(),
        }
    }

    #[must_use]
    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = variable.into();
        self
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.folder.join(day_file_name(date))
    }
}

impl DaySource for NetcdfDaySource {
    fn fetch(&self, date: NaiveDate) -> Result<Option<Vec<RasterGrid>>> {
        let path = self.path_for(date);
        if !path.is_file() {
            debug!(%date, path = %path.display(), "day file not present");
            return Ok(None);
        }

        debug!(path = %path.display(), "Processing file");
        let file = netcdf::open(&path)?;
        let (data, lat, lon, units, fill_value) = read_cube(&file, &self.variable, "mm/h")?;

        data.axis_iter(Axis(0))
            .map(|slice| {
                RasterGrid::new(slice.to_owned(), lat.clone(), lon.clone(), units.clone())
                    .map(|grid| grid.with_fill_value(fill_value))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

/// Read a `(time, lat, lon)` variable and its `time` keys into a field.
///
/// Files without a `time` variable get keys `1..=n`.
///
/// # Errors
///
/// Returns an error if the file, the variable or its axes cannot be read.
pub fn read_field(path: &Path, var_name: &str) -> Result<TimeIndexedField> {
    if !path.is_file() {
        return Err(PrecipError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "dataset file does not exist"),
        ));
    }

    let file = netcdf::open(path)?;
    let (data, lat, lon, units, fill_value) = read_cube(&file, var_name, "mm/day")?;

    let n_time = data.len_of(Axis(0));
    let time = match file.variable("time") {
        Some(var) => var.get_values::<i32, _>(..)?,
        None => (1..=n_time as i32).collect(),
    };

    info!(
        path = %path.display(),
        variable = var_name,
        shape = ?data.shape(),
        "🚀 Loaded field"
    );

    Ok(TimeIndexedField::new(data, time, lat, lon, units)?.with_fill_value(fill_value))
}

/// Unified NetCDF writer for pipeline artifacts
pub struct NetCDFWriter<'a> {
    output_path: &'a Path,
}

impl<'a> NetCDFWriter<'a> {
    /// Create a new NetCDF writer
    pub fn new(output_path: &'a Path) -> Self {
        Self { output_path }
    }

    /// Write `field` as `var_name`, optionally with a scalar `max_value`.
    ///
    /// The file is written to a `.partial` sibling and renamed on success.
    ///
    /// # Errors
    ///
    /// Returns an error if any NetCDF call or the final rename fails.
    pub fn write_field(
        &self,
        field: &TimeIndexedField,
        var_name: &str,
        max_value: Option<f32>,
    ) -> Result<()> {
        write_atomically(self.output_path, |partial| {
            Self::write_to(partial, field, var_name, max_value)
        })?;

        info!(
            path = %self.output_path.display(),
            variable = var_name,
            shape = ?field.data().shape(),
            "✅ Saved result"
        );
        Ok(())
    }

    fn write_to(
        path: &Path,
        field: &TimeIndexedField,
        var_name: &str,
        max_value: Option<f32>,
    ) -> Result<()> {
        let mut file = netcdf::create(path)?;

        file.add_dimension("time", field.len())?;
        file.add_dimension("lat", field.lat().len())?;
        file.add_dimension("lon", field.lon().len())?;

        {
            let mut time = file.add_variable::<i32>("time", &["time"])?;
            time.put_values(field.time(), ..)?;
        }

        {
            #[allow(clippy::cast_possible_truncation)]
            let lat: Vec<f32> = field.lat().iter().map(|&v| v as f32).collect();
            let mut var = file.add_variable::<f32>("lat", &["lat"])?;
            var.put_attribute("units", "degree_north")?;
            var.put_values(&lat, ..)?;
        }

        {
            #[allow(clippy::cast_possible_truncation)]
            let lon: Vec<f32> = field.lon().iter().map(|&v| v as f32).collect();
            let mut var = file.add_variable::<f32>("lon", &["lon"])?;
            var.put_attribute("units", "degree_east")?;
            var.put_values(&lon, ..)?;
        }

        {
            let mut var = file.add_variable::<f32>(var_name, &["time", "lat", "lon"])?;
            var.put_attribute("_FillValue", NO_DATA)?;
            var.put_attribute("units", field.units())?;
            var.put(field.data().view(), ..)?;
        }

        if let Some(max_value) = max_value {
            let mut var = file.add_variable::<f32>("max_value", &[])?;
            var.put_attribute("units", field.units())?;
            var.put_values(&[max_value], ..)?;
        }

        file.add_attribute(
            "history",
            format!("Created by precip_regrid on {}", Utc::now().to_rfc3339()),
        )?;

        Ok(())
    }
}

/// Read back the scalar `max_value` written next to an annual total.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or has no `max_value` variable.
pub fn read_max_value(path: &Path) -> Result<f32> {
    let file = netcdf::open(path)?;
    let values = variable(&file, "max_value")?.get_values::<f32, _>(..)?;
    values
        .first()
        .copied()
        .ok_or_else(|| PrecipError::shape_mismatch("max_value variable is empty"))
}
