//! Creates a folder of synthetic hourly precipitation files for local runs.
//!
//! Usage: `cargo run --example create_sample_days -- [folder] [year] [days]`
//!
//! Writes `YYYYMMDD.nc` files with a 24-step `r1h` variable on a small
//! 0.0625° grid, the layout the pipeline reads from its download folder.

use chrono::NaiveDate;
use ndarray::Array3;
use netcdf::create;
use std::path::{Path, PathBuf};

const N_LAT: usize = 32;
const N_LON: usize = 40;
const LAT0: f32 = 30.0;
const LON0: f32 = 130.0;
const STEP: f32 = 0.0625;

fn write_day(folder: &Path, date: NaiveDate, seed: usize) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = folder.join(format!("{}.nc", date.format("%Y%m%d")));
    let mut file = create(&path)?;

    file.add_dimension("time", 24)?;
    file.add_dimension("lat", N_LAT)?;
    file.add_dimension("lon", N_LON)?;

    let lat: Vec<f32> = (0..N_LAT).map(|i| LAT0 + i as f32 * STEP).collect();
    let lon: Vec<f32> = (0..N_LON).map(|i| LON0 + i as f32 * STEP).collect();
    file.add_variable::<f32>("lat", &["lat"])?.put_values(&lat, ..)?;
    file.add_variable::<f32>("lon", &["lon"])?.put_values(&lon, ..)?;

    // A rain band drifting east through the day
    let rain = Array3::from_shape_fn((24, N_LAT, N_LON), |(h, y, x)| {
        let center = ((h + seed) % N_LON) as f32;
        let distance = (x as f32 - center).abs() + (y as f32 - N_LAT as f32 / 2.0).abs() / 4.0;
        (4.0 - distance).max(0.0) * 0.5
    });

    let mut var = file.add_variable::<f32>("r1h", &["time", "lat", "lon"])?;
    var.put_attribute("units", "mm/h")?;
    var.put(rain.view(), ..)?;

    Ok(path)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let folder = PathBuf::from(args.next().unwrap_or_else(|| "./nc/GPvMSM/2015".to_string()));
    let year: i32 = args.next().map_or(Ok(2015), |s| s.parse())?;
    let days: usize = args.next().map_or(Ok(31), |s| s.parse())?;

    std::fs::create_dir_all(&folder)?;
    let first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or("invalid year")?;

    println!("🔨 Creating {days} sample day files in {}", folder.display());
    for (seed, date) in first.iter_days().take(days).enumerate() {
        let path = write_day(&folder, date, seed)?;
        println!("   {}", path.display());
    }
    println!("✅ Done. Run with --download-folder {} --skip-download", folder.display());

    Ok(())
}
