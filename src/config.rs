//! Validated run configuration passed explicitly to the pipeline.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::download::DEFAULT_WORKERS;
use crate::errors::{PrecipError, Result};
use crate::netcdf_io::HOURLY_VARIABLE;
use crate::regrid::{RegridMethod, RegridSpec};

pub const DEFAULT_YEAR: i32 = 2015;
pub const DEFAULT_GRID_SIZE: f64 = 0.5;
pub const DEFAULT_YEARLY_DIR: &str = "./nc/GPvMSM/yearly_data";

/// Default raw-file folder for a year, `./nc/GPvMSM/{year}`
pub fn default_download_folder(year: i32) -> PathBuf {
    Path::new("./nc/GPvMSM").join(year.to_string())
}

/// Parse `YYYY/MM/DD` or `YYYY-MM-DD`.
///
/// # Errors
///
/// Returns [`PrecipError::InvalidConfig`] for anything else.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    ["%Y/%m/%d", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .ok_or_else(|| {
            PrecipError::InvalidConfig(format!(
                "invalid date '{value}', expected YYYY/MM/DD or YYYY-MM-DD"
            ))
        })
}

/// Everything one pipeline run needs
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub year: i32,
    pub download_folder: PathBuf,
    pub yearly_dir: PathBuf,
    pub input_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub regrid: RegridSpec,
    /// Remote root of the daily files; downloads are skipped without one
    pub base_url: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub download_workers: usize,
    pub source_variable: String,
    pub skip_download: bool,
}

impl PipelineConfig {
    /// Defaults for `year`: the whole calendar year, 0.5° `max` regridding.
    ///
    /// # Errors
    ///
    /// Returns [`PrecipError::InvalidConfig`] if the year has no valid calendar dates.
    pub fn for_year(year: i32) -> Result<Self> {
        let start_date = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| PrecipError::InvalidConfig(format!("unsupported year {year}")))?;
        let end_date = NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| PrecipError::InvalidConfig(format!("unsupported year {year}")))?;

        Ok(Self {
            year,
            download_folder: default_download_folder(year),
            yearly_dir: PathBuf::from(DEFAULT_YEARLY_DIR),
            input_file: None,
            output_file: None,
            regrid: RegridSpec::new(DEFAULT_GRID_SIZE, DEFAULT_GRID_SIZE, RegridMethod::Max)?,
            base_url: None,
            start_date,
            end_date,
            download_workers: DEFAULT_WORKERS,
            source_variable: HOURLY_VARIABLE.to_string(),
            skip_download: false,
        })
    }

    #[must_use]
    pub fn with_download_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.download_folder = folder.into();
        self
    }

    #[must_use]
    pub fn with_yearly_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.yearly_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_regrid(mut self, regrid: RegridSpec) -> Self {
        self.regrid = regrid;
        self
    }

    /// Yearly daily-precipitation file, `{yearly_dir}/{year}.nc`
    pub fn year_file(&self) -> PathBuf {
        self.yearly_dir.join(format!("{}.nc", self.year))
    }

    /// Annual-total file, `{yearly_dir}/{year}_sum.nc`
    pub fn sum_file(&self) -> PathBuf {
        self.yearly_dir.join(format!("{}_sum.nc", self.year))
    }

    /// Regrid input; the year file unless overridden
    pub fn input_file(&self) -> PathBuf {
        self.input_file.clone().unwrap_or_else(|| self.year_file())
    }

    /// Regrid output, `{yearly_dir}/{year}_upscaled_{method}.nc` unless overridden
    pub fn output_file(&self) -> PathBuf {
        self.output_file.clone().unwrap_or_else(|| {
            self.yearly_dir.join(format!(
                "{}_upscaled_{}.nc",
                self.year,
                self.regrid.method()
            ))
        })
    }

    pub fn download_enabled(&self) -> bool {
        !self.skip_download && self.base_url.is_some()
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`PrecipError::InvalidConfig`] on an inverted date range, zero
    /// download workers or an empty variable name.
    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(PrecipError::InvalidConfig(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        if self.download_workers == 0 {
            return Err(PrecipError::InvalidConfig(
                "download workers must be at least 1".to_string(),
            ));
        }
        if self.source_variable.trim().is_empty() {
            return Err(PrecipError::InvalidConfig(
                "source variable name is empty".to_string(),
            ));
        }
        Ok(())
    }
}
