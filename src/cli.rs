//! Defines command-line interface options using `clap` for the precip_regrid application.
//!
//! Every option also reads an environment variable, so a `.env` file loaded before
//! parsing configures a run the same way flags do.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{parse_date, PipelineConfig, DEFAULT_YEAR};
use crate::download::DEFAULT_WORKERS;
use crate::errors::Result;
use crate::netcdf_io::HOURLY_VARIABLE;
use crate::regrid::{RegridMethod, RegridSpec};

/// Aggregate hourly precipitation into yearly totals and regrid them
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    name = "precip_regrid",
    about = "Yearly precipitation aggregation and box-window regridding for NetCDF rasters"
)]
pub struct Args {
    /// Calendar year to process
    #[arg(short, long, env = "PROCESS_YEAR", default_value_t = DEFAULT_YEAR)]
    pub year: i32,

    /// Folder holding the raw YYYYMMDD.nc day files. Defaults to ./nc/GPvMSM/<year>
    #[arg(long, env = "DOWNLOAD_FOLDER")]
    pub download_folder: Option<PathBuf>,

    /// Folder receiving the yearly, annual-sum and regridded files
    #[arg(long, env = "YEARLY_DIR", default_value = crate::config::DEFAULT_YEARLY_DIR)]
    pub yearly_dir: PathBuf,

    /// Field to regrid. Defaults to the yearly file of daily totals
    #[arg(long, env = "INPUT_FILE")]
    pub input_file: Option<PathBuf>,

    /// Regridded output path. Defaults to <yearly_dir>/<year>_upscaled_<method>.nc
    #[arg(long, env = "OUTPUT_FILE")]
    pub output_file: Option<PathBuf>,

    /// Target cell height in degrees
    #[arg(long, env = "LAT_GRID_SIZE", default_value_t = crate::config::DEFAULT_GRID_SIZE)]
    pub lat_grid_size: f64,

    /// Target cell width in degrees
    #[arg(long, env = "LON_GRID_SIZE", default_value_t = crate::config::DEFAULT_GRID_SIZE)]
    pub lon_grid_size: f64,

    /// Reducer for each target cell: max, mean, median or center
    #[arg(long, env = "UPSCALING_METHOD", default_value = "max")]
    pub regrid_method: String,

    /// Remote root of the daily files, e.g. http://host/r1h/. Without it nothing is downloaded
    #[arg(long, env = "BASE_URL")]
    pub base_url: Option<String>,

    /// First date to download, YYYY/MM/DD or YYYY-MM-DD. Defaults to January 1
    #[arg(long, env = "START_DATE")]
    pub start_date: Option<String>,

    /// Last date to download, YYYY/MM/DD or YYYY-MM-DD. Defaults to December 31
    #[arg(long, env = "END_DATE")]
    pub end_date: Option<String>,

    /// Maximum number of concurrent downloads
    #[arg(long, env = "DOWNLOAD_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub download_workers: usize,

    /// Skip the download stage even when a base URL is configured
    #[arg(long, env = "SKIP_DOWNLOAD", default_value_t = false)]
    pub skip_download: bool,

    /// Precipitation variable inside the raw day files
    #[arg(long, default_value = HOURLY_VARIABLE)]
    pub source_variable: String,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Log filter used when RUST_LOG is not set, e.g. info or precip_regrid=debug
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate the arguments into a [`PipelineConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown method, non-positive grid sizes,
    /// malformed dates or an inconsistent date range.
    pub fn into_config(self) -> Result<PipelineConfig> {
        let method: RegridMethod = self.regrid_method.parse()?;
        let regrid = RegridSpec::new(self.lat_grid_size, self.lon_grid_size, method)?;

        let mut config = PipelineConfig::for_year(self.year)?
            .with_yearly_dir(self.yearly_dir)
            .with_regrid(regrid);

        if let Some(folder) = self.download_folder {
            config = config.with_download_folder(folder);
        }
        if let Some(start) = self.start_date.as_deref() {
            config.start_date = parse_date(start)?;
        }
        if let Some(end) = self.end_date.as_deref() {
            config.end_date = parse_date(end)?;
        }

        config.input_file = self.input_file;
        config.output_file = self.output_file;
        config.base_url = self.base_url.filter(|url| !url.trim().is_empty());
        config.download_workers = self.download_workers;
        config.skip_download = self.skip_download;
        config.source_variable = self.source_variable;

        config.validate()?;
        Ok(config)
    }
}
