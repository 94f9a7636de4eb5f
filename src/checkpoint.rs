//! Skip-if-output-exists guard for pipeline stages
//!
//! The existence of a stage's output artifact is the only state that survives a
//! process run. Artifacts are written to a `.partial` sibling and renamed into
//! place on success, so a crashed stage leaves nothing the gate would mistake for
//! finished output.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::{PrecipError, Result};

/// What a guarded stage did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage ran and produced the artifact
    Computed(PathBuf),
    /// The artifact already existed; nothing was done
    Skipped(PathBuf),
}

impl StageOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Computed(path) | Self::Skipped(path) => path,
        }
    }

    pub fn was_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

pub struct CheckpointGate;

impl CheckpointGate {
    /// True when the stage should run, i.e. nothing exists at `output_path`.
    pub fn guard(output_path: &Path) -> bool {
        !output_path.exists()
    }

    /// Run `stage` unless `output_path` already exists.
    ///
    /// The closure receives the final artifact path and is expected to create it.
    ///
    /// # Errors
    ///
    /// Propagates the stage's own error; the gate adds none of its own.
    pub fn run<F>(output_path: &Path, stage_name: &str, stage: F) -> Result<StageOutcome>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        if !Self::guard(output_path) {
            info!(
                stage = stage_name,
                path = %output_path.display(),
                "✅ Output already exists, skipping stage"
            );
            return Ok(StageOutcome::Skipped(output_path.to_path_buf()));
        }

        info!(stage = stage_name, path = %output_path.display(), "🚀 Running stage");
        stage(output_path)?;
        info!(stage = stage_name, path = %output_path.display(), "✅ Stage complete");

        Ok(StageOutcome::Computed(output_path.to_path_buf()))
    }
}

/// Sibling path that receives an artifact while it is being written
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("artifact"));
    name.push(".partial");
    path.with_file_name(name)
}

/// Create the parent directory of `path` if it is missing
pub fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| PrecipError::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Write an artifact through its `.partial` sibling and rename it into place.
///
/// A stale partial file from an interrupted run is removed first.
///
/// # Errors
///
/// Returns the writer's error, or [`PrecipError::Io`] if the rename fails.
pub fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    ensure_parent(path)?;
    let partial = partial_path(path);
    if partial.exists() {
        fs::remove_file(&partial).map_err(|e| PrecipError::io(&partial, e))?;
    }

    if let Err(e) = write(&partial) {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }

    fs::rename(&partial, path).map_err(|e| PrecipError::io(path, e))
}
