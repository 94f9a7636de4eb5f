//! Parallel processing configuration and management
//!
//! Regridding and temporal sums run on Rayon's global pool; this module sizes it
//! once at startup and reports what the process ended up with.

use rayon::ThreadPoolBuilder;
use tracing::info;

use crate::errors::{PrecipError, Result};

/// Configuration for parallel processing
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Set up the global Rayon thread pool with the specified configuration
    ///
    /// # Errors
    ///
    /// Returns [`PrecipError::ThreadPool`] if the pool was already built or the
    /// thread count is rejected.
    pub fn setup_global_pool(&self) -> Result<()> {
        match self.num_threads {
            Some(0) => Err(PrecipError::ThreadPool(
                "thread count must be at least 1".to_string(),
            )),
            Some(num_threads) => {
                ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build_global()
                    .map_err(|e| {
                        PrecipError::ThreadPool(format!(
                            "Failed to initialize thread pool with {num_threads} threads: {e}"
                        ))
                    })?;
                info!(threads = num_threads, "✅ Configured parallel processing");
                Ok(())
            }
            None => {
                info!(
                    threads = rayon::current_num_threads(),
                    "✅ Using default thread pool configuration"
                );
                Ok(())
            }
        }
    }

    pub fn current_threads(&self) -> usize {
        rayon::current_num_threads()
    }

    /// Create a configuration that uses all available CPU cores
    pub fn all_cores() -> Self {
        Self {
            num_threads: Some(num_cpus::get()),
        }
    }

    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
        }
    }
}

/// Get information about the current parallel configuration
pub fn get_parallel_info() -> ParallelInfo {
    ParallelInfo {
        current_threads: rayon::current_num_threads(),
        available_cores: num_cpus::get(),
        available_parallelism: std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1),
    }
}

/// Information about the parallel processing environment
#[derive(Debug, Clone)]
pub struct ParallelInfo {
    pub current_threads: usize,
    pub available_cores: usize,
    pub available_parallelism: usize,
}

impl ParallelInfo {
    pub fn log(&self) {
        info!(
            current_threads = self.current_threads,
            available_cores = self.available_cores,
            available_parallelism = self.available_parallelism,
            "📊 Parallel processing information"
        );
    }
}
