//! Resumable raw-file acquisition
//!
//! Key features:
//! - Manifest of dates already present locally, read once before scheduling
//! - Bounded number of concurrent fetches over independent dates
//! - 404s and per-date failures are logged and counted, never escalated
//! - Files land under a `.partial` name and are renamed when complete

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, instrument, warn};

use crate::checkpoint::partial_path;
use crate::errors::{PrecipError, Result};
use crate::netcdf_io::day_file_name;

/// Default number of concurrent downloads
pub const DEFAULT_WORKERS: usize = 5;

/// Dates whose raw file is already present in the download folder
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    present: BTreeSet<NaiveDate>,
}

impl Manifest {
    /// List `folder` once, creating it when it does not exist yet.
    ///
    /// Only names of the form `YYYYMMDD.nc` are recognised.
    ///
    /// # Errors
    ///
    /// Returns [`PrecipError::Io`] if the folder cannot be created or listed.
    pub fn scan(folder: &Path) -> Result<Self> {
        if !folder.exists() {
            fs::create_dir_all(folder).map_err(|e| PrecipError::io(folder, e))?;
            return Ok(Self::default());
        }

        let mut present = BTreeSet::new();
        for entry in fs::read_dir(folder).map_err(|e| PrecipError::io(folder, e))? {
            let entry = entry.map_err(|e| PrecipError::io(folder, e))?;
            if let Some(date) = entry.file_name().to_str().and_then(parse_day_file_name) {
                present.insert(date);
            }
        }

        debug!(folder = %folder.display(), files = present.len(), "manifest scanned");
        Ok(Self { present })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.present.contains(&date)
    }

    pub fn len(&self) -> usize {
        self.present.len()
    }

    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }

    /// Dates in `start..=end` without a local file, in calendar order
    pub fn missing(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| !self.contains(*d))
            .collect()
    }
}

fn parse_day_file_name(name: &str) -> Option<NaiveDate> {
    let stem = name.strip_suffix(".nc")?;
    if stem.len() != 8 || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(stem, "%Y%m%d").ok()
}

/// Result of fetching one date
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded(PathBuf),
    /// The remote has no file for this date
    NotFound,
}

/// Capability to retrieve the raw file of one date into `dest`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, date: NaiveDate, dest: &Path) -> Result<FetchOutcome>;
}

/// Fetches `{base_url}{YYYY}/{MMDD}.nc` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: String,
}

impl HttpFetcher {
    /// # Errors
    ///
    /// Returns [`PrecipError::Download`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self { client, base_url })
    }

    pub fn url_for(&self, date: NaiveDate) -> String {
        format!(
            "{}{}/{}.nc",
            self.base_url,
            date.format("%Y"),
            date.format("%m%d")
        )
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self, dest))]
    async fn fetch(&self, date: NaiveDate, dest: &Path) -> Result<FetchOutcome> {
        let url = self.url_for(date);
        let mut response = self.client.get(&url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(FetchOutcome::NotFound);
        }
        if !status.is_success() {
            return Err(PrecipError::Download {
                url,
                message: format!("unexpected HTTP status {status}"),
            });
        }

        let partial = partial_path(dest);
        let bytes = match stream_to(&mut response, &partial).await {
            Ok(bytes) => bytes,
            Err(e) => {
                // A truncated body must not survive as a half-written file
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        tokio::fs::rename(&partial, dest)
            .await
            .map_err(|e| PrecipError::io(dest, e))?;

        debug!(url = %url, bytes, "fetched");
        Ok(FetchOutcome::Downloaded(dest.to_path_buf()))
    }
}

/// Write the response body to `partial`, returning the byte count.
async fn stream_to(response: &mut reqwest::Response, partial: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(partial)
        .await
        .map_err(|e| PrecipError::io(partial, e))?;

    let mut bytes = 0_u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk)
            .await
            .map_err(|e| PrecipError::io(partial, e))?;
        bytes += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| PrecipError::io(partial, e))?;
    Ok(bytes)
}

/// Summary of one download pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub downloaded: Vec<NaiveDate>,
    pub not_found: Vec<NaiveDate>,
    pub failed: Vec<(NaiveDate, String)>,
    /// Dates already present before the pass
    pub skipped: usize,
}

/// Downloads every missing date of a range with bounded concurrency.
pub struct DownloadStage<F> {
    folder: PathBuf,
    fetcher: F,
    workers: usize,
}

impl<F: Fetcher> DownloadStage<F> {
    pub fn new(folder: impl Into<PathBuf>, fetcher: F) -> Self {
        Self {
            folder: folder.into(),
            fetcher,
            workers: DEFAULT_WORKERS,
        }
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Fetch every date in `start..=end` that the manifest does not list.
    ///
    /// # Errors
    ///
    /// Only an inverted range or an unreadable download folder fail the stage;
    /// per-date problems end up in the report.
    pub async fn run(&self, start: NaiveDate, end: NaiveDate) -> Result<DownloadReport> {
        if start > end {
            return Err(PrecipError::InvalidConfig(format!(
                "download range starts after it ends ({start} > {end})"
            )));
        }

        let manifest = Manifest::scan(&self.folder)?;
        let missing = manifest.missing(start, end);
        let total = start.iter_days().take_while(|d| *d <= end).count();

        let mut report = DownloadReport {
            skipped: total - missing.len(),
            ..DownloadReport::default()
        };

        if missing.is_empty() {
            info!(folder = %self.folder.display(), "✅ No missing files");
            return Ok(report);
        }

        info!(
            folder = %self.folder.display(),
            missing = missing.len(),
            present = report.skipped,
            workers = self.workers,
            "🚀 Downloading missing files"
        );

        let outcomes: Vec<(NaiveDate, Result<FetchOutcome>)> = stream::iter(missing)
            .map(|date| {
                let dest = self.folder.join(day_file_name(date));
                async move {
                    let outcome = self.fetcher.fetch(date, &dest).await;
                    (date, outcome)
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        for (date, outcome) in outcomes {
            match outcome {
                Ok(FetchOutcome::Downloaded(path)) => {
                    info!(%date, path = %path.display(), "Downloaded");
                    report.downloaded.push(date);
                }
                Ok(FetchOutcome::NotFound) => {
                    warn!(%date, "Unable to download: 404 Not Found");
                    report.not_found.push(date);
                }
                Err(e) => {
                    error!(%date, error = %e, "download failed");
                    report.failed.push((date, e.to_string()));
                }
            }
        }

        report.downloaded.sort_unstable();
        report.not_found.sort_unstable();
        report.failed.sort_unstable_by_key(|(date, _)| *date);

        info!(
            downloaded = report.downloaded.len(),
            not_found = report.not_found.len(),
            failed = report.failed.len(),
            "✅ Download pass finished"
        );
        Ok(report)
    }

    /// Run the pass on a dedicated multi-threaded runtime.
    ///
    /// # Errors
    ///
    /// Same as [`DownloadStage::run`], plus a failure to start the runtime.
    pub fn run_blocking(&self, start: NaiveDate, end: NaiveDate) -> Result<DownloadReport> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.workers)
            .enable_all()
            .build()
            .map_err(|e| PrecipError::ThreadPool(format!("failed to start download runtime: {e}")))?;

        runtime.block_on(self.run(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, month, day).unwrap()
    }

    struct ScriptedFetcher {
        not_found: Vec<NaiveDate>,
        broken: Vec<NaiveDate>,
        requested: Mutex<Vec<NaiveDate>>,
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, date: NaiveDate, dest: &Path) -> Result<FetchOutcome> {
            self.requested.lock().unwrap().push(date);
            if self.not_found.contains(&date) {
                return Ok(FetchOutcome::NotFound);
            }
            if self.broken.contains(&date) {
                return Err(PrecipError::Download {
                    url: date.to_string(),
                    message: "connection reset".to_string(),
                });
            }
            fs::write(dest, b"raw").map_err(|e| PrecipError::io(dest, e))?;
            Ok(FetchOutcome::Downloaded(dest.to_path_buf()))
        }
    }

    #[test]
    fn manifest_recognises_day_files_only() {
        let dir = tempdir().expect("Failed to create temp dir");
        for name in ["20150101.nc", "20150103.nc", "notes.txt", "2015010.nc", "20151399.nc"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let manifest = Manifest::scan(dir.path()).unwrap();
        assert_eq!(manifest.len(), 2);
        assert!(manifest.contains(date(1, 1)));
        assert_eq!(manifest.missing(date(1, 1), date(1, 4)), vec![date(1, 2), date(1, 4)]);
    }

    #[test]
    fn manifest_creates_missing_folder() {
        let dir = tempdir().expect("Failed to create temp dir");
        let folder = dir.path().join("GPvMSM").join("2015");

        let manifest = Manifest::scan(&folder).unwrap();
        assert!(manifest.is_empty());
        assert!(folder.is_dir());
    }

    #[test]
    fn url_layout() {
        let fetcher = HttpFetcher::new("http://example.org/r1h").unwrap();
        assert_eq!(fetcher.url_for(date(8, 1)), "http://example.org/r1h/2015/0801.nc");
    }

    /// Serve one connection with a canned raw HTTP response, then hang up.
    async fn serve_once(response: &'static [u8]) -> String {
        use tokio::io::AsyncReadExt;
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0_u8; 4096];
            let _ = socket.read(&mut request).await;
            socket.write_all(response).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn http_404_is_not_found() {
        let dir = tempdir().expect("Failed to create temp dir");
        let dest = dir.path().join("20150801.nc");
        let base_url =
            serve_once(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;

        let outcome = HttpFetcher::new(base_url).unwrap().fetch(date(8, 1), &dest).await.unwrap();
        assert_eq!(outcome, FetchOutcome::NotFound);
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn http_server_error_is_a_download_error() {
        let dir = tempdir().expect("Failed to create temp dir");
        let dest = dir.path().join("20150801.nc");
        let base_url = serve_once(
            b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        match HttpFetcher::new(base_url).unwrap().fetch(date(8, 1), &dest).await {
            Err(PrecipError::Download { url, message }) => {
                assert!(url.ends_with("/2015/0801.nc"));
                assert!(message.contains("500"));
            }
            other => panic!("Expected Download error, got {other:?}"),
        }
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn http_body_lands_under_final_name() {
        let dir = tempdir().expect("Failed to create temp dir");
        let dest = dir.path().join("20150801.nc");
        let base_url =
            serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 9\r\nConnection: close\r\n\r\nraw bytes").await;

        let outcome = HttpFetcher::new(base_url).unwrap().fetch(date(8, 1), &dest).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Downloaded(dest.clone()));
        assert_eq!(fs::read(&dest).unwrap(), b"raw bytes");
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn truncated_body_leaves_no_partial_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        let dest = dir.path().join("20150801.nc");
        let base_url =
            serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nshort").await;

        let result = HttpFetcher::new(base_url).unwrap().fetch(date(8, 1), &dest).await;
        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }

    #[test]
    fn stage_fetches_only_missing_dates_and_absorbs_failures() {
        let dir = tempdir().expect("Failed to create temp dir");
        fs::write(dir.path().join("20150102.nc"), b"").unwrap();

        let fetcher = ScriptedFetcher {
            not_found: vec![date(1, 3)],
            broken: vec![date(1, 4)],
            requested: Mutex::new(Vec::new()),
        };
        let stage = DownloadStage::new(dir.path(), fetcher).with_workers(2);

        let report = tokio_test::block_on(stage.run(date(1, 1), date(1, 5))).unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.downloaded, vec![date(1, 1), date(1, 5)]);
        assert_eq!(report.not_found, vec![date(1, 3)]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, date(1, 4));

        let mut requested = stage.fetcher.requested.lock().unwrap().clone();
        requested.sort_unstable();
        assert_eq!(requested, vec![date(1, 1), date(1, 3), date(1, 4), date(1, 5)]);
        assert!(dir.path().join("20150105.nc").is_file());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let dir = tempdir().expect("Failed to create temp dir");
        let fetcher = ScriptedFetcher {
            not_found: Vec::new(),
            broken: Vec::new(),
            requested: Mutex::new(Vec::new()),
        };
        let stage = DownloadStage::new(dir.path(), fetcher);

        let result = tokio_test::block_on(stage.run(date(2, 1), date(1, 1)));
        assert!(matches!(result, Err(PrecipError::InvalidConfig(_))));
    }
}
