//! Entry point for the precip_regrid application.
//! Loads `.env`, parses the CLI, sets up logging and the thread pool, then runs the pipeline.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use precip_regrid::cli::Args;
use precip_regrid::parallel::{get_parallel_info, ParallelConfig};
use precip_regrid::pipeline::PipelineDriver;

fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; variables may come from the shell
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!(
        r#"
------------------------------------------------------------------
              ___                _         ___             _    _
             | _ \_ _ ___ __(_)_ __  | _ \___ __ _ _ _(_)__| |
             |  _/ '_/ -_) _| | '_ \ |   / -_) _` | '_| / _` |
             |_| |_| \___\__|_| .__/ |_|_\___\__, |_| |_\__,_|
                            |_|             |___/
           yearly precipitation aggregation and regridding
------------------------------------------------------------------
"#
    );

    ParallelConfig::new(args.threads)
        .setup_global_pool()
        .context("failed to configure the thread pool")?;
    get_parallel_info().log();

    let config = args.into_config().context("invalid configuration")?;
    let year = config.year;

    let report = PipelineDriver::new(config)
        .run()
        .with_context(|| format!("pipeline for {year} failed"))?;

    if let Some(download) = &report.download {
        tracing::info!(
            downloaded = download.downloaded.len(),
            not_found = download.not_found.len(),
            failed = download.failed.len(),
            already_present = download.skipped,
            "Download summary"
        );
    }
    if report.all_skipped() {
        tracing::info!("Nothing to do, every output already exists");
    }

    Ok(())
}
