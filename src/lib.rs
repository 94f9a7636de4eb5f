//! precip_regrid: yearly precipitation aggregation and box-window regridding
//!
//! A Rust library and CLI that turns a folder of hourly gridded precipitation
//! files into a yearly field of daily totals, an annual total with its maximum,
//! and a coarser regridded copy of the yearly field.
//!
//! ## Key Features
//!
//! - **Resumable Downloads**: only dates missing locally are fetched, with bounded concurrency
//! - **Temporal Aggregation**: hourly → daily → yearly sums with no-data awareness
//! - **Box-Window Regridding**: max, mean, median and center reducers over half-open windows
//! - **Parallel Processing**: Rayon over time slices and target cells
//! - **Checkpointing**: every stage is skipped when its output already exists
//!
//! ## Module Organization
//!
//! - [`raster`]: grids, coordinate axes and time-indexed fields
//! - [`aggregation`]: temporal sums, year assembly and annual totals
//! - [`regrid`]: target grids, windows and reducers
//! - [`checkpoint`]: skip-if-output-exists guard and atomic writes
//! - [`download`]: manifest and bounded-parallel fetching of raw day files
//! - [`netcdf_io`]: NetCDF reading and writing
//! - [`data_source`]: the per-day raster source abstraction
//! - [`pipeline`]: the stage-sequential driver
//! - [`config`] and [`cli`]: run configuration
//! - [`parallel`]: Rayon thread pool configuration
//! - [`errors`]: Centralized error handling
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use precip_regrid::prelude::*;
//!
//! let config = PipelineConfig::for_year(2015)
//!     .unwrap()
//!     .with_download_folder("./nc/GPvMSM/2015")
//!     .with_regrid(RegridSpec::new(0.5, 0.5, RegridMethod::Mean).unwrap());
//!
//! let report = PipelineDriver::new(config).run().unwrap();
//! println!("regridded field at {}", report.regrid.path().display());
//! ```

pub mod aggregation;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod data_source;
pub mod download;
pub mod errors;
pub mod netcdf_io;
pub mod parallel;
pub mod pipeline;
pub mod raster;
pub mod regrid;

pub use errors::{PrecipError, Result};
pub use raster::{CoordinateAxis, RasterGrid, TimeIndexedField, NO_DATA};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::aggregation::{AnnualAggregator, TemporalReducer, YearAssembler};
    pub use crate::checkpoint::{CheckpointGate, StageOutcome};
    pub use crate::config::PipelineConfig;
    pub use crate::data_source::DaySource;
    pub use crate::download::{DownloadStage, FetchOutcome, Fetcher, HttpFetcher, Manifest};
    pub use crate::errors::{PrecipError, Result};
    pub use crate::netcdf_io::{read_field, NetCDFWriter, NetcdfDaySource};
    pub use crate::parallel::ParallelConfig;
    pub use crate::pipeline::{PipelineDriver, PipelineReport};
    pub use crate::raster::{CoordinateAxis, RasterGrid, TimeIndexedField, NO_DATA};
    pub use crate::regrid::{GridResampler, RegridMethod, RegridSpec};
}
