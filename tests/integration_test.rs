//! End-to-end runs of the pipeline over synthetic hourly day files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use ndarray::{array, Array2, Array3};
use netcdf::create;
use precip_regrid::download::{FetchOutcome, Fetcher};
use precip_regrid::netcdf_io::{read_field, read_max_value, NetCDFWriter, ANNUAL_VARIABLE, DAILY_VARIABLE};
use precip_regrid::prelude::*;
use tempfile::tempdir;

const LAT: [f32; 4] = [30.0, 30.25, 30.5, 30.75];
const LON: [f32; 4] = [130.0, 130.25, 130.5, 130.75];

/// Cell pattern shared by every day: 1..=16 in row-major order
fn base() -> Array2<f32> {
    Array2::from_shape_fn((4, 4), |(y, x)| (1 + y * 4 + x) as f32)
}

/// Two hourly slices, `scale * base` and `2 * scale * base`, so the day sums to `3 * scale * base`
fn write_day(folder: &Path, date: NaiveDate, scale: f32) -> PathBuf {
    let path = folder.join(format!("{}.nc", date.format("%Y%m%d")));
    let mut file = create(&path).expect("Failed to create NetCDF file");

    file.add_dimension("time", 2).expect("Failed to add dimension time");
    file.add_dimension("lat", LAT.len()).expect("Failed to add dimension lat");
    file.add_dimension("lon", LON.len()).expect("Failed to add dimension lon");

    file.add_variable::<f32>("lat", &["lat"])
        .expect("Failed to add lat")
        .put_values(&LAT, ..)
        .expect("Failed to write lat");
    file.add_variable::<f32>("lon", &["lon"])
        .expect("Failed to add lon")
        .put_values(&LON, ..)
        .expect("Failed to write lon");

    let b = base();
    let hourly = Array3::from_shape_fn((2, 4, 4), |(h, y, x)| scale * (h + 1) as f32 * b[[y, x]]);
    let mut var = file
        .add_variable::<f32>("r1h", &["time", "lat", "lon"])
        .expect("Failed to add variable");
    var.put_attribute("units", "mm/h").expect("Failed to write units");
    var.put(hourly.view(), ..).expect("Failed to write data");

    path
}

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, month, day).unwrap()
}

fn config_for(root: &Path) -> PipelineConfig {
    PipelineConfig::for_year(2015)
        .unwrap()
        .with_download_folder(root.join("raw"))
        .with_yearly_dir(root.join("yearly"))
}

#[test]
fn pipeline_builds_year_sum_and_regrid_then_skips_on_rerun() -> Result<()> {
    let dir = tempdir().expect("Failed to create temp dir");
    let config = config_for(dir.path());
    std::fs::create_dir_all(&config.download_folder).unwrap();

    write_day(&config.download_folder, date(1, 1), 1.0);
    write_day(&config.download_folder, date(1, 2), 2.0);
    write_day(&config.download_folder, date(1, 5), 3.0);

    let driver = PipelineDriver::new(config.clone());
    let report = driver.run()?;

    assert!(report.download.is_none());
    assert!(!report.year.was_skipped());
    assert!(!report.sum.was_skipped());
    assert!(!report.regrid.was_skipped());

    // Year file: 365 daily slices, absent days are zero
    let year = read_field(&config.year_file(), DAILY_VARIABLE)?;
    assert_eq!(year.data().shape(), &[365, 4, 4]);
    assert_eq!(year.time()[0], 1);
    assert_eq!(year.time()[364], 365);
    assert_eq!(year.units(), "mm/day");
    assert_eq!(year.data()[[0, 3, 3]], 48.0);
    assert_eq!(year.data()[[1, 0, 0]], 6.0);
    assert_eq!(year.data()[[2, 2, 2]], 0.0);
    assert_eq!(year.data()[[4, 0, 1]], 18.0);

    // Annual total: (3 + 6 + 9) * base
    let sum = read_field(&config.sum_file(), ANNUAL_VARIABLE)?;
    assert_eq!(sum.time(), &[2015]);
    assert_eq!(sum.units(), "mm/year");
    assert_eq!(sum.data()[[0, 0, 0]], 18.0);
    assert_eq!(sum.data()[[0, 3, 3]], 288.0);
    assert_eq!(read_max_value(&config.sum_file())?, 288.0);

    // Regrid at 0.5°: windows cover rows/cols {0} and {1, 2}
    let regridded = read_field(&config.output_file(), DAILY_VARIABLE)?;
    assert_eq!(regridded.data().shape(), &[365, 2, 2]);
    assert_eq!(regridded.lat().values(), &[30.0, 30.5]);
    assert_eq!(regridded.lon().values(), &[130.0, 130.5]);
    assert_eq!(regridded.data()[[0, 0, 0]], 3.0);
    assert_eq!(regridded.data()[[0, 1, 1]], 33.0);
    assert_eq!(regridded.data()[[3, 1, 1]], 0.0);

    let rerun = PipelineDriver::new(config.clone()).run()?;
    assert!(rerun.all_skipped());
    assert_eq!(rerun.regrid.path(), config.output_file().as_path());

    Ok(())
}

#[test]
fn rerun_rebuilds_only_the_removed_sum_file() -> Result<()> {
    let dir = tempdir().expect("Failed to create temp dir");
    let config = config_for(dir.path());
    std::fs::create_dir_all(&config.download_folder).unwrap();
    write_day(&config.download_folder, date(1, 1), 1.0);
    write_day(&config.download_folder, date(1, 2), 2.0);

    PipelineDriver::new(config.clone()).run()?;
    std::fs::remove_file(config.sum_file()).unwrap();

    let rerun = PipelineDriver::new(config.clone()).run()?;
    assert!(rerun.year.was_skipped());
    assert!(!rerun.sum.was_skipped());
    assert!(rerun.regrid.was_skipped());

    // (3 + 6) * base
    let sum = read_field(&config.sum_file(), ANNUAL_VARIABLE)?;
    assert_eq!(sum.data()[[0, 0, 0]], 9.0);
    assert_eq!(sum.data()[[0, 3, 3]], 144.0);
    assert_eq!(read_max_value(&config.sum_file())?, 144.0);

    Ok(())
}

#[test]
fn missing_first_day_aborts_without_artifacts() {
    let dir = tempdir().expect("Failed to create temp dir");
    let config = config_for(dir.path());
    std::fs::create_dir_all(&config.download_folder).unwrap();
    write_day(&config.download_folder, date(1, 2), 1.0);

    match PipelineDriver::new(config.clone()).run() {
        Err(PrecipError::MissingReferenceGrid { year }) => assert_eq!(year, 2015),
        other => panic!("Expected MissingReferenceGrid error, got {other:?}"),
    }
    assert!(!config.year_file().exists());
    assert!(!config.sum_file().exists());
}

#[test]
fn regrid_stage_on_explicit_input_file() -> Result<()> {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("column.nc");

    let field = TimeIndexedField::new(
        array![[[1.0_f32], [5.0], [2.0], [9.0]]],
        vec![1],
        CoordinateAxis::new(vec![10.0, 10.5, 11.0, 11.5]),
        CoordinateAxis::new(vec![20.0]),
        "mm/day",
    )?;
    NetCDFWriter::new(&input).write_field(&field, DAILY_VARIABLE, None)?;

    let mut config = config_for(dir.path()).with_regrid(RegridSpec::new(1.0, 1.0, RegridMethod::Max)?);
    config.input_file = Some(input);
    config.output_file = Some(dir.path().join("column_max.nc"));

    let outcome = PipelineDriver::new(config.clone()).regrid()?;
    assert_eq!(outcome, StageOutcome::Computed(dir.path().join("column_max.nc")));

    let out = read_field(&config.output_file(), DAILY_VARIABLE)?;
    assert_eq!(out.lat().values(), &[10.0, 11.0]);
    assert_eq!(out.lon().values(), &[20.0]);
    assert_eq!(out.data(), &array![[[1.0_f32], [5.0]]]);
    assert_eq!(out.units(), "mm/day");

    Ok(())
}

/// Publishes every other day, starting with January 1
struct SyntheticFetcher;

#[async_trait]
impl Fetcher for SyntheticFetcher {
    async fn fetch(&self, date: NaiveDate, dest: &Path) -> Result<FetchOutcome> {
        if date.day0() % 2 == 1 {
            return Ok(FetchOutcome::NotFound);
        }
        let folder = dest.parent().unwrap();
        Ok(FetchOutcome::Downloaded(write_day(folder, date, 1.0)))
    }
}

#[test]
fn downloaded_days_feed_the_year_stage() -> Result<()> {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut config = config_for(dir.path());
    config.end_date = date(1, 4);

    let driver = PipelineDriver::new(config.clone());
    let first = driver.download_with(SyntheticFetcher)?;
    assert_eq!(first.downloaded, vec![date(1, 1), date(1, 3)]);
    assert_eq!(first.not_found, vec![date(1, 2), date(1, 4)]);
    assert_eq!(first.skipped, 0);

    // Only the two 404 dates are still missing
    let second = driver.download_with(SyntheticFetcher)?;
    assert_eq!(second.skipped, 2);
    assert!(second.downloaded.is_empty());

    driver.assemble_year()?;
    let year = read_field(&config.year_file(), DAILY_VARIABLE)?;
    assert_eq!(year.data()[[0, 0, 0]], 3.0);
    assert_eq!(year.data()[[1, 0, 0]], 0.0);
    assert_eq!(year.data()[[2, 0, 0]], 3.0);

    Ok(())
}
