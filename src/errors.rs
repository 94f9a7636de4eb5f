//! Centralized error handling for precip_regrid
//!
//! Every stage of the pipeline reports failures through [`PrecipError`]. Per-date
//! download failures are the only errors that are logged and swallowed; everything
//! else aborts the enclosing stage.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for precip_regrid operations
#[derive(Debug, Error)]
pub enum PrecipError {
    /// Remote source has no published file for a date
    #[error("no source file published for {date}")]
    NotFound { date: NaiveDate },

    /// Coordinate vectors or shapes differ between slices expected to align
    #[error("shape mismatch: {message}")]
    ShapeMismatch { message: String },

    /// The first day of the year is absent, so no reference grid exists
    #[error("missing reference grid: no data for {year}-01-01")]
    MissingReferenceGrid { year: i32 },

    /// Temporal reducer called with no slices
    #[error("cannot reduce an empty sequence of rasters")]
    EmptyInput,

    /// Annual aggregation called on a field without time slices
    #[error("cannot aggregate a field with no time slices")]
    EmptyField,

    /// Unreadable or unwritable artifact
    #[error("I/O failure on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// NetCDF file operation errors
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] netcdf::Error),

    /// Variable not found in NetCDF file
    #[error("Variable '{var}' not found in file")]
    VariableNotFound { var: String },

    /// Array shape or dimension error
    #[error("Array error: {0}")]
    Array(#[from] ndarray::ShapeError),

    /// Configuration values that cannot drive the pipeline
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Regrid method outside {max, mean, median, center}
    #[error("unknown regrid method '{0}' (expected one of: max, mean, median, center)")]
    UnknownMethod(String),

    /// Transport or HTTP status failure while fetching a raw file
    #[error("download of {url} failed: {message}")]
    Download { url: String, message: String },

    /// Thread pool configuration error
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

impl PrecipError {
    /// Attach a path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn shape_mismatch(message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for PrecipError {
    fn from(error: reqwest::Error) -> Self {
        let url = error
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        PrecipError::Download {
            url,
            message: error.to_string(),
        }
    }
}

/// Result type alias for precip_regrid operations
pub type Result<T> = std::result::Result<T, PrecipError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_mentions_path() {
        let err = PrecipError::io(
            "/tmp/2015.nc",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let text = err.to_string();
        assert!(text.contains("/tmp/2015.nc"));
        assert!(text.contains("denied"));
    }

    #[test]
    fn missing_reference_names_the_year() {
        let err = PrecipError::MissingReferenceGrid { year: 2016 };
        assert_eq!(
            err.to_string(),
            "missing reference grid: no data for 2016-01-01"
        );
    }
}
