//! Box-window regridding onto a regular target grid
//!
//! Each target cell collects the source cells whose latitude and longitude fall in
//! a half-open window centered on it, then collapses them with a [`RegridMethod`].
//!
//! # Organization
//!
//! - [`method`]: the reducer policies (max, mean, median, center)
//! - [`window`]: target axis construction and binary-searched window bounds
//! - [`resampler`]: the parallel resampler for single rasters and whole fields

pub mod method;
pub mod resampler;
pub mod window;

pub use method::{RegridMethod, Window};
pub use resampler::{GridResampler, RegridSpec};
pub use window::{target_axis, SortedAxis, WindowPlan};
