//! Reducer policies for collapsing a window of source cells into one value.

use std::fmt;
use std::str::FromStr;

use ndarray::ArrayView2;

use crate::errors::PrecipError;
use crate::raster::{is_no_data, NO_DATA};

/// Supported regridding reducers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegridMethod {
    /// Largest finite value in the window
    Max,
    /// Arithmetic mean of finite values
    Mean,
    /// Median of finite values
    Median,
    /// Geometric center cell, or the mean of the central 2×2 block
    Center,
}

impl RegridMethod {
    pub const ALL: [RegridMethod; 4] = [Self::Max, Self::Mean, Self::Median, Self::Center];

    /// Get the string representation of the method
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Max => "max",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Center => "center",
        }
    }

    /// Reduce one window to a single value; empty or all-missing windows give [`NO_DATA`].
    pub fn reduce(self, window: &Window<'_>) -> f32 {
        match self {
            Self::Max => window_max(window),
            Self::Mean => window_mean(window),
            Self::Median => window_median(window),
            Self::Center => window_center(window),
        }
    }
}

impl fmt::Display for RegridMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegridMethod {
    type Err = PrecipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| PrecipError::UnknownMethod(s.to_string()))
    }
}

/// The source cells of one target cell: a row set crossed with a column set.
///
/// Row and column indices are ordered by ascending coordinate.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    pub data: ArrayView2<'a, f32>,
    pub rows: &'a [usize],
    pub cols: &'a [usize],
    pub fill_value: Option<f32>,
}

impl<'a> Window<'a> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.cols.is_empty()
    }

    /// Value at position `(r, c)` within the window
    fn at(&self, r: usize, c: usize) -> f32 {
        self.data[[self.rows[r], self.cols[c]]]
    }

    fn valid(&self, value: f32) -> bool {
        !is_no_data(value, self.fill_value)
    }

    /// Finite, non-fill values of the window
    pub fn values(self) -> impl Iterator<Item = f32> + 'a {
        let Window {
            data,
            rows,
            cols,
            fill_value,
        } = self;
        rows.iter()
            .flat_map(move |&r| cols.iter().map(move |&c| data[[r, c]]))
            .filter(move |&v| !is_no_data(v, fill_value))
    }
}

fn window_max(window: &Window<'_>) -> f32 {
    window
        .values()
        .fold(None, |acc: Option<f32>, v| Some(acc.map_or(v, |m| m.max(v))))
        .unwrap_or(NO_DATA)
}

#[allow(clippy::cast_possible_truncation)]
fn mean_of(values: impl Iterator<Item = f32>) -> f32 {
    let (sum, count) = values.fold((0.0_f64, 0_u32), |(sum, count), v| {
        (sum + f64::from(v), count + 1)
    });

    if count > 0 {
        (sum / f64::from(count)) as f32
    } else {
        NO_DATA
    }
}

fn window_mean(window: &Window<'_>) -> f32 {
    mean_of(window.values())
}

fn window_median(window: &Window<'_>) -> f32 {
    let mut values: Vec<f32> = window.values().collect();
    if values.is_empty() {
        return NO_DATA;
    }

    values.sort_unstable_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        mean_of([values[mid - 1], values[mid]].into_iter())
    }
}

/// Indices straddling the middle of an axis of length `n` (one for odd, two for even).
fn central_indices(n: usize) -> std::ops::RangeInclusive<usize> {
    if n % 2 == 1 {
        n / 2..=n / 2
    } else {
        n / 2 - 1..=n / 2
    }
}

fn window_center(window: &Window<'_>) -> f32 {
    if window.is_empty() {
        return NO_DATA;
    }

    let (n_rows, n_cols) = (window.rows.len(), window.cols.len());
    if n_rows % 2 == 1 && n_cols % 2 == 1 {
        let value = window.at(n_rows / 2, n_cols / 2);
        return if window.valid(value) { value } else { NO_DATA };
    }

    let block = central_indices(n_rows).flat_map(|r| central_indices(n_cols).map(move |c| (r, c)));
    mean_of(
        block
            .map(|(r, c)| window.at(r, c))
            .filter(|&v| window.valid(v)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn reduce_all(method: RegridMethod, data: &Array2<f32>) -> f32 {
        let rows: Vec<usize> = (0..data.nrows()).collect();
        let cols: Vec<usize> = (0..data.ncols()).collect();
        method.reduce(&Window {
            data: data.view(),
            rows: &rows,
            cols: &cols,
            fill_value: None,
        })
    }

    #[test]
    fn parses_known_methods_case_insensitively() {
        assert_eq!("max".parse::<RegridMethod>().unwrap(), RegridMethod::Max);
        assert_eq!("Mean".parse::<RegridMethod>().unwrap(), RegridMethod::Mean);
        assert_eq!(" MEDIAN ".parse::<RegridMethod>().unwrap(), RegridMethod::Median);
        assert_eq!("center".parse::<RegridMethod>().unwrap(), RegridMethod::Center);
    }

    #[test]
    fn rejects_unknown_method() {
        match "bilinear".parse::<RegridMethod>() {
            Err(PrecipError::UnknownMethod(name)) => assert_eq!(name, "bilinear"),
            other => panic!("Expected UnknownMethod error, got {other:?}"),
        }
    }

    #[test]
    fn center_of_odd_window_is_middle_cell() {
        let data = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        assert_eq!(reduce_all(RegridMethod::Center, &data), 5.0);
    }

    #[test]
    fn center_of_even_window_is_central_block_mean() {
        let two = array![[1.0, 2.0], [3.0, 5.0]];
        assert_eq!(reduce_all(RegridMethod::Center, &two), 2.75);

        let four = Array2::from_shape_fn((4, 4), |(r, c)| (r * 4 + c) as f32);
        // central block: 5, 6, 9, 10
        assert_eq!(reduce_all(RegridMethod::Center, &four), 7.5);
    }

    #[test]
    fn center_of_mixed_parity_window() {
        // three rows, two columns: block collapses to the middle row
        let data = array![[1.0, 2.0], [3.0, 5.0], [7.0, 9.0]];
        assert_eq!(reduce_all(RegridMethod::Center, &data), 4.0);
    }

    #[test]
    fn median_ignores_missing_values() {
        let data = array![[4.0, f32::NAN, 1.0], [3.0, 2.0, f32::NAN]];
        assert_eq!(reduce_all(RegridMethod::Median, &data), 2.5);
        assert_eq!(reduce_all(RegridMethod::Max, &data), 4.0);
        assert_eq!(reduce_all(RegridMethod::Mean, &data), 2.5);
    }

    #[test]
    fn window_values_outlive_the_window_binding() {
        let data = array![[1.0, f32::NAN], [3.0, -1.0]];
        let rows = [0, 1];
        let cols = [0, 1];

        let values = {
            let window = Window {
                data: data.view(),
                rows: &rows,
                cols: &cols,
                fill_value: Some(-1.0),
            };
            window.values()
        };
        assert_eq!(values.collect::<Vec<_>>(), vec![1.0, 3.0]);
    }

    #[test]
    fn all_missing_window_is_no_data() {
        let data = array![[f32::NAN, f32::NAN]];
        for method in RegridMethod::ALL {
            assert!(reduce_all(method, &data).is_nan(), "{method} should give no-data");
        }
    }
}
