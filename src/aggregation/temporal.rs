//! Element-wise summation of rasters that share a coordinate grid.

use ndarray::{Array2, ArrayView2, Zip};
use tracing::debug;

use crate::errors::{PrecipError, Result};
use crate::raster::{is_no_data, RasterGrid, TimeIndexedField};

/// Folds a sequence of same-grid rasters into their element-wise sum.
///
/// This single rule serves both hour→day and day→year folding. No-data cells
/// contribute nothing to the sum.
pub struct TemporalReducer;

impl TemporalReducer {
    /// Sum `slices` cell by cell.
    ///
    /// # Errors
    ///
    /// - [`PrecipError::EmptyInput`] when `slices` is empty
    /// - [`PrecipError::ShapeMismatch`] when any slice sits on different coordinates
    pub fn reduce(slices: &[RasterGrid]) -> Result<RasterGrid> {
        let first = slices.first().ok_or(PrecipError::EmptyInput)?;

        if let Some((index, _)) = slices
            .iter()
            .enumerate()
            .find(|(_, s)| !s.shares_grid_with(first))
        {
            return Err(PrecipError::shape_mismatch(format!(
                "slice {index} does not share the coordinate grid of slice 0"
            )));
        }

        if slices.len() == 1 {
            return Ok(first.clone());
        }

        debug!(slices = slices.len(), shape = ?first.shape(), "summing rasters");

        let mut total = Array2::<f32>::zeros(first.shape());
        for slice in slices {
            accumulate(&mut total, slice.data().view(), slice.fill_value());
        }

        RasterGrid::new(total, first.lat().clone(), first.lon().clone(), first.units())
    }

    /// Sum every time slice of `field` with the same kernel as [`TemporalReducer::reduce`].
    ///
    /// # Errors
    ///
    /// Returns [`PrecipError::EmptyField`] when the field has no slices.
    pub fn reduce_field(field: &TimeIndexedField) -> Result<RasterGrid> {
        if field.is_empty() {
            return Err(PrecipError::EmptyField);
        }

        let mut total = Array2::<f32>::zeros((field.lat().len(), field.lon().len()));
        for index in 0..field.len() {
            accumulate(&mut total, field.slice_view(index), field.fill_value());
        }

        RasterGrid::new(total, field.lat().clone(), field.lon().clone(), field.units())
    }
}

fn accumulate(total: &mut Array2<f32>, slice: ArrayView2<'_, f32>, fill_value: Option<f32>) {
    Zip::from(total).and(slice).par_for_each(|acc, &x| {
        if !is_no_data(x, fill_value) {
            *acc += x;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::CoordinateAxis;
    use ndarray::{array, Array3};

    fn axes() -> (CoordinateAxis, CoordinateAxis) {
        (
            CoordinateAxis::new(vec![30.0, 30.5]),
            CoordinateAxis::new(vec![130.0, 130.5]),
        )
    }

    fn grid(values: Array2<f32>) -> RasterGrid {
        let (lat, lon) = axes();
        RasterGrid::new(values, lat, lon, "mm/h").unwrap()
    }

    #[test]
    fn sums_three_slices() {
        let a = grid(array![[1.0, 2.0], [3.0, 4.0]]);
        let b = grid(array![[10.0, 20.0], [30.0, 40.0]]);
        let c = grid(array![[0.5, 0.5], [0.5, 0.5]]);

        let total = TemporalReducer::reduce(&[a, b, c]).unwrap();
        assert_eq!(total.data(), &array![[11.5, 22.5], [33.5, 44.5]]);
        assert_eq!(total.units(), "mm/h");
    }

    #[test]
    fn single_slice_is_returned_unchanged() {
        let a = grid(array![[1.0, f32::NAN], [3.0, 4.0]]);
        let total = TemporalReducer::reduce(std::slice::from_ref(&a)).unwrap();
        assert_eq!(total.data()[[0, 0]], 1.0);
        assert!(total.data()[[0, 1]].is_nan());
        assert_eq!(total.data()[[1, 1]], 4.0);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            TemporalReducer::reduce(&[]),
            Err(PrecipError::EmptyInput)
        ));
    }

    #[test]
    fn different_grids_are_rejected() {
        let a = grid(array![[1.0, 2.0], [3.0, 4.0]]);
        let b = RasterGrid::new(
            array![[1.0, 2.0], [3.0, 4.0]],
            CoordinateAxis::new(vec![31.0, 31.5]),
            CoordinateAxis::new(vec![130.0, 130.5]),
            "mm/h",
        )
        .unwrap();

        assert!(matches!(
            TemporalReducer::reduce(&[a, b]),
            Err(PrecipError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn no_data_cells_are_skipped() {
        let a = grid(array![[1.0, -999.0], [f32::NAN, 4.0]]).with_fill_value(Some(-999.0));
        let b = grid(array![[1.0, 2.0], [3.0, 4.0]]);

        let total = TemporalReducer::reduce(&[a, b]).unwrap();
        assert_eq!(total.data(), &array![[2.0, 2.0], [3.0, 8.0]]);
    }

    #[test]
    fn field_reduction_matches_slice_reduction() {
        let (lat, lon) = axes();
        let data = Array3::from_shape_vec((3, 2, 2), (0..12).map(|v| v as f32).collect()).unwrap();
        let field = TimeIndexedField::new(data, vec![1, 2, 3], lat, lon, "mm/day").unwrap();

        let by_field = TemporalReducer::reduce_field(&field).unwrap();
        let slices: Vec<RasterGrid> = field.slices().collect();
        let by_slices = TemporalReducer::reduce(&slices).unwrap();

        assert_eq!(by_field.data(), by_slices.data());
        assert_eq!(by_field.data(), &array![[12.0, 15.0], [18.0, 21.0]]);
    }
}
