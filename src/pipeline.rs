//! Stage-sequential driver: download, year assembly, annual sum, regrid.
//!
//! Each artifact-producing stage runs behind a [`CheckpointGate`], so a rerun
//! after a crash resumes at the first stage whose output is missing.

use tracing::info;

use crate::aggregation::{AnnualAggregator, YearAssembler};
use crate::checkpoint::{CheckpointGate, StageOutcome};
use crate::config::PipelineConfig;
use crate::download::{DownloadReport, DownloadStage, Fetcher, HttpFetcher};
use crate::errors::Result;
use crate::netcdf_io::{read_field, NetCDFWriter, NetcdfDaySource, ANNUAL_VARIABLE, DAILY_VARIABLE};
use crate::regrid::GridResampler;

/// What each stage of one run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// `None` when the download stage was not configured
    pub download: Option<DownloadReport>,
    pub year: StageOutcome,
    pub sum: StageOutcome,
    pub regrid: StageOutcome,
}

impl PipelineReport {
    /// True when every artifact stage found its output already in place
    pub fn all_skipped(&self) -> bool {
        self.year.was_skipped() && self.sum.was_skipped() && self.regrid.was_skipped()
    }
}

pub struct PipelineDriver {
    config: PipelineConfig,
}

impl PipelineDriver {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run every stage in order; the first failing stage aborts the run.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that fails.
    pub fn run(&self) -> Result<PipelineReport> {
        self.config.validate()?;
        info!(
            year = self.config.year,
            method = %self.config.regrid.method(),
            lat_step = self.config.regrid.lat_step(),
            lon_step = self.config.regrid.lon_step(),
            "🚀 Starting precipitation pipeline"
        );

        let download = match self.config.base_url.as_deref() {
            Some(base_url) if self.config.download_enabled() => {
                Some(self.download_with(HttpFetcher::new(base_url)?)?)
            }
            _ => {
                info!(
                    folder = %self.config.download_folder.display(),
                    "Download stage disabled, using local files only"
                );
                None
            }
        };

        let report = PipelineReport {
            download,
            year: self.assemble_year()?,
            sum: self.sum_year()?,
            regrid: self.regrid()?,
        };

        info!(
            year_file = %report.year.path().display(),
            sum_file = %report.sum.path().display(),
            regrid_file = %report.regrid.path().display(),
            "✅ Pipeline finished"
        );
        Ok(report)
    }

    /// Fill the download folder for the configured date range using `fetcher`.
    ///
    /// # Errors
    ///
    /// Fails only if the folder cannot be listed or the runtime cannot start.
    pub fn download_with<F: Fetcher>(&self, fetcher: F) -> Result<DownloadReport> {
        DownloadStage::new(&self.config.download_folder, fetcher)
            .with_workers(self.config.download_workers)
            .run_blocking(self.config.start_date, self.config.end_date)
    }

    /// Sum each day's raw slices and stack the days into `{year}.nc`.
    ///
    /// # Errors
    ///
    /// Fails without January 1, on a grid mismatch, or on any I/O error.
    pub fn assemble_year(&self) -> Result<StageOutcome> {
        let source = NetcdfDaySource::new(&self.config.download_folder)
            .with_variable(&self.config.source_variable);
        let assembler = YearAssembler::new(self.config.year);

        CheckpointGate::run(&self.config.year_file(), "year", |path| {
            let field = assembler.assemble(&source)?;
            NetCDFWriter::new(path).write_field(&field, DAILY_VARIABLE, None)
        })
    }

    /// Collapse the year file into `{year}_sum.nc` with its maximum.
    ///
    /// # Errors
    ///
    /// Fails if the year file is unreadable or holds no days.
    pub fn sum_year(&self) -> Result<StageOutcome> {
        let year_file = self.config.year_file();
        let year = self.config.year;

        CheckpointGate::run(&self.config.sum_file(), "sum", |path| {
            let field = read_field(&year_file, DAILY_VARIABLE)?;
            let (total, max_value) = AnnualAggregator::new().aggregate(&field)?;
            info!(year, max_value, "📊 Annual maximum");

            let annual = AnnualAggregator::into_field(&total, year)?;
            NetCDFWriter::new(path).write_field(&annual, ANNUAL_VARIABLE, Some(max_value))
        })
    }

    /// Regrid the input field onto the configured target grid.
    ///
    /// # Errors
    ///
    /// Fails if the input field is unreadable or the output cannot be written.
    pub fn regrid(&self) -> Result<StageOutcome> {
        let input = self.config.input_file();
        let resampler = GridResampler::new(self.config.regrid);

        CheckpointGate::run(&self.config.output_file(), "regrid", |path| {
            let field = read_field(&input, DAILY_VARIABLE)?;
            let regridded = resampler.resample_field(&field)?;
            NetCDFWriter::new(path).write_field(&regridded, DAILY_VARIABLE, None)
        })
    }
}
