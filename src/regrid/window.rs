//! Target grid construction and half-open window lookup on source axes.

use crate::errors::{PrecipError, Result};
use crate::raster::CoordinateAxis;

/// Upper bound on the number of target centers along one axis
pub const MAX_TARGET_CELLS: usize = 10_000_000;

/// Regular axis from `min(source)` in steps of `step`, stopping strictly below `max(source)`.
///
/// Mirrors `arange(min, max, step)`: the source's maximum coordinate is never a
/// target center, so the outermost source row/column can fall outside every window.
/// A single-valued axis keeps its one coordinate as the only center.
///
/// # Errors
///
/// Returns [`PrecipError::InvalidConfig`] when `step` is so small relative to the
/// axis span that more than [`MAX_TARGET_CELLS`] centers would be needed.
pub fn target_axis(source: &CoordinateAxis, step: f64) -> Result<CoordinateAxis> {
    let Some((min, max)) = source.bounds() else {
        return Ok(CoordinateAxis::new(Vec::new()));
    };

    let span = max - min;
    if span == 0.0 {
        return Ok(CoordinateAxis::new(vec![min]));
    }

    let cells = (span / step).ceil();
    if !cells.is_finite() || cells > MAX_TARGET_CELLS as f64 {
        return Err(PrecipError::InvalidConfig(format!(
            "grid size {step} over a span of {span} degrees needs more than {MAX_TARGET_CELLS} cells"
        )));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = cells as usize;
    Ok(CoordinateAxis::new(
        (0..count).map(|k| min + k as f64 * step).collect::<Vec<_>>(),
    ))
}

/// Source axis sorted by coordinate, remembering each value's original index.
#[derive(Debug, Clone)]
pub struct SortedAxis {
    coords: Vec<f64>,
    indices: Vec<usize>,
}

impl SortedAxis {
    pub fn new(axis: &CoordinateAxis) -> Self {
        let mut pairs: Vec<(f64, usize)> = axis
            .iter()
            .copied()
            .enumerate()
            .map(|(i, c)| (c, i))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let (coords, indices) = pairs.into_iter().unzip();
        Self { coords, indices }
    }

    /// Original indices with coordinate in `[center - half, center + half)`, ascending by coordinate.
    pub fn window(&self, center: f64, half: f64) -> &[usize] {
        let lower = center - half;
        let upper = center + half;
        let start = self.coords.partition_point(|&c| c < lower);
        let end = self.coords.partition_point(|&c| c < upper);
        &self.indices[start..end.max(start)]
    }
}

/// Precomputed source windows for every target row and column.
#[derive(Debug, Clone)]
pub struct WindowPlan {
    pub target_lat: CoordinateAxis,
    pub target_lon: CoordinateAxis,
    pub lat_windows: Vec<Vec<usize>>,
    pub lon_windows: Vec<Vec<usize>>,
}

impl WindowPlan {
    /// # Errors
    ///
    /// Fails when either target axis would be too large, see [`target_axis`].
    pub fn new(
        lat: &CoordinateAxis,
        lon: &CoordinateAxis,
        lat_step: f64,
        lon_step: f64,
    ) -> Result<Self> {
        let target_lat = target_axis(lat, lat_step)?;
        let target_lon = target_axis(lon, lon_step)?;

        let sorted_lat = SortedAxis::new(lat);
        let sorted_lon = SortedAxis::new(lon);

        let lat_windows = target_lat
            .iter()
            .map(|&c| sorted_lat.window(c, lat_step / 2.0).to_vec())
            .collect();
        let lon_windows = target_lon
            .iter()
            .map(|&c| sorted_lon.window(c, lon_step / 2.0).to_vec())
            .collect();

        Ok(Self {
            target_lat,
            target_lon,
            lat_windows,
            lon_windows,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.target_lat.len(), self.target_lon.len())
    }
}
