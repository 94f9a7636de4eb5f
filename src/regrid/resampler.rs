//! Parallel box-window resampling of rasters and time-indexed fields.

use ndarray::parallel::prelude::*;
use ndarray::{Array2, Array3, ArrayView2, ArrayViewMut2, Axis, Zip};
use tracing::info;

use super::method::{RegridMethod, Window};
use super::window::WindowPlan;
use crate::errors::{PrecipError, Result};
use crate::raster::{CoordinateAxis, RasterGrid, TimeIndexedField};

/// Target cell size and reducer; validated on construction and immutable afterwards
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegridSpec {
    lat_step: f64,
    lon_step: f64,
    method: RegridMethod,
}

impl RegridSpec {
    /// # Errors
    ///
    /// Returns [`PrecipError::InvalidConfig`] unless both steps are finite and positive.
    pub fn new(lat_step: f64, lon_step: f64, method: RegridMethod) -> Result<Self> {
        for (name, step) in [("lat_step", lat_step), ("lon_step", lon_step)] {
            if !step.is_finite() || step <= 0.0 {
                return Err(PrecipError::InvalidConfig(format!(
                    "{name} must be a positive number of degrees, got {step}"
                )));
            }
        }

        Ok(Self {
            lat_step,
            lon_step,
            method,
        })
    }

    pub fn lat_step(&self) -> f64 {
        self.lat_step
    }

    pub fn lon_step(&self) -> f64 {
        self.lon_step
    }

    pub fn method(&self) -> RegridMethod {
        self.method
    }
}

/// Maps source rasters onto a regular target grid with a [`RegridMethod`].
///
/// Every target cell is reduced from the source cells whose coordinates fall in
/// `[center - step/2, center + step/2)` on both axes. A window with no usable
/// source cell becomes [`crate::NO_DATA`], never zero.
#[derive(Debug, Clone)]
pub struct GridResampler {
    spec: RegridSpec,
}

impl GridResampler {
    pub fn new(spec: RegridSpec) -> Self {
        Self { spec }
    }

    fn plan(&self, lat: &CoordinateAxis, lon: &CoordinateAxis) -> Result<WindowPlan> {
        WindowPlan::new(lat, lon, self.spec.lat_step, self.spec.lon_step)
    }

    /// Resample one raster.
    ///
    /// # Errors
    ///
    /// Fails when the target grid would be too large, or if the resulting grid
    /// cannot be built from its own axes.
    pub fn resample(&self, source: &RasterGrid) -> Result<RasterGrid> {
        let plan = self.plan(source.lat(), source.lon())?;
        let mut out = Array2::<f32>::zeros(plan.shape());
        self.fill_slice(
            &plan,
            source.data().view(),
            source.fill_value(),
            out.view_mut(),
        );

        RasterGrid::new(out, plan.target_lat, plan.target_lon, source.units())
    }

    /// Resample every slice of `field` independently, keeping slice order and time keys.
    ///
    /// # Errors
    ///
    /// Fails when the target grid would be too large, or if the resulting field
    /// cannot be built from its own axes.
    pub fn resample_field(&self, field: &TimeIndexedField) -> Result<TimeIndexedField> {
        let plan = self.plan(field.lat(), field.lon())?;
        let (n_lat, n_lon) = plan.shape();

        info!(
            method = %self.spec.method,
            lat_step = self.spec.lat_step,
            lon_step = self.spec.lon_step,
            source_shape = ?field.data().shape(),
            target_shape = ?(field.len(), n_lat, n_lon),
            threads = rayon::current_num_threads(),
            "⚡ Regridding field"
        );

        let mut out = Array3::<f32>::zeros((field.len(), n_lat, n_lon));
        let fill_value = field.fill_value();
        out.axis_iter_mut(Axis(0))
            .into_par_iter()
            .zip(field.data().axis_iter(Axis(0)).into_par_iter())
            .for_each(|(target, source)| self.fill_slice(&plan, source, fill_value, target));

        TimeIndexedField::new(
            out,
            field.time().to_vec(),
            plan.target_lat,
            plan.target_lon,
            field.units(),
        )
    }

    fn fill_slice<'a>(
        &self,
        plan: &'a WindowPlan,
        source: ArrayView2<'a, f32>,
        fill_value: Option<f32>,
        target: ArrayViewMut2<'_, f32>,
    ) {
        let method = self.spec.method;
        Zip::indexed(target).par_for_each(|(i, j), cell| {
            let window = Window {
                data: source,
                rows: &plan.lat_windows[i],
                cols: &plan.lon_windows[j],
                fill_value,
            };
            *cell = method.reduce(&window);
        });
    }
}
