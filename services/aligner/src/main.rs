//! Tropical-cyclone alignment batch runner.
//!
//! Indexes SFMR files into the brief table, matches storms against them
//! and loads aligned feature rows. Each command runs once and exits;
//! Ctrl-C aborts the current command and removes any partial download.

mod config;
mod download;
mod index;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use matchup::{
    index_briefs, run_storm, DirTrackLoader, Era5Files, FixSource, MatchupEngine, PgBriefIndex,
    PgFixSource, RasterSource,
};
use storage::PgStore;
use tc_common::TimeRange;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use config::AlignerConfig;
use download::Downloader;
use index::{discover_sfmr_files, read_briefs};

#[derive(Parser, Debug)]
#[command(name = "aligner")]
#[command(about = "Align SFMR observations and ERA5 fields around tropical cyclones")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "ALIGNER_CONFIG", default_value = "config/aligner.yaml")]
    config: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record the extent of every SFMR file in the brief table
    IndexSfmr {
        /// Only index files of this year
        #[arg(long)]
        year: Option<i32>,
    },

    /// Match storms with fixes in a time range
    Match {
        /// Range start (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,

        /// Range end (RFC 3339)
        #[arg(long)]
        end: DateTime<Utc>,

        /// Only match this storm
        #[arg(long)]
        sid: Option<String>,

        /// Skip ERA5 attachment even if an ERA5 directory is configured
        #[arg(long)]
        no_era5: bool,
    },

    /// Download one file into the output directory
    Download {
        url: String,

        /// Output file name (default: last URL segment)
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);
    if args.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    let config = AlignerConfig::load(&args.config)?;
    info!(config = %args.config.display(), basin = %config.matchup.basin, "Loaded configuration");

    tokio::select! {
        result = run(args.command, config) => {
            if let Err(e) = &result {
                error!(error = %e, "Command failed");
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Received shutdown signal, aborting");
            Ok(())
        }
    }
}

async fn run(command: Command, config: AlignerConfig) -> Result<()> {
    match command {
        Command::IndexSfmr { year } => index_sfmr(&config, year).await,
        Command::Match {
            start,
            end,
            sid,
            no_era5,
        } => match_storms(&config, TimeRange::new(start, end), sid, no_era5).await,
        Command::Download { url, name } => {
            let name = match name {
                Some(name) => name,
                None => url
                    .rsplit('/')
                    .next()
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .context("URL has no file name")?,
            };
            let downloader = Downloader::new(&config.temp_dir, &config.output_dir)?;
            downloader.fetch(&url, &name).await?;
            Ok(())
        }
    }
}

async fn index_sfmr(config: &AlignerConfig, year: Option<i32>) -> Result<()> {
    let files = discover_sfmr_files(&config.sfmr_dir, year);
    info!(root = %config.sfmr_dir.display(), files = files.len(), "Discovered SFMR files");

    let (briefs, skipped) = read_briefs(files).await?;
    let store = PgStore::connect(&config.database_url).await?;
    let report = index_briefs(&store, &briefs, config.matchup.insert_batch_size).await?;

    info!(
        briefs = briefs.len(),
        skipped_files = skipped,
        inserted = report.inserted,
        already_indexed = report.skipped_existing,
        "SFMR index updated"
    );
    Ok(())
}

async fn match_storms(
    config: &AlignerConfig,
    range: TimeRange,
    sid: Option<String>,
    no_era5: bool,
) -> Result<()> {
    let store = PgStore::connect(&config.database_url).await?;
    let pool = store.pool().clone();

    let fixes = PgFixSource::new(pool.clone(), config.fix_table.clone())?;
    let engine = MatchupEngine::new(
        config.matchup.clone(),
        PgBriefIndex::new(pool),
        DirTrackLoader::new(&config.sfmr_dir),
    );
    let era5 = match (&config.era5_dir, no_era5) {
        (Some(dir), false) => Some(Era5Files::new(dir)),
        _ => None,
    };
    let rasters = era5.as_ref().map(|r| r as &dyn RasterSource);

    let sids = match sid {
        Some(sid) => vec![sid],
        None => fixes.storms(&range).await?,
    };
    info!(storms = sids.len(), start = %range.start, end = %range.end, "Matching storms");

    for sid in sids {
        let track = fixes.fixes(&sid).await?;
        if track.len() < 2 {
            warn!(sid = %sid, fixes = track.len(), "Too few fixes to match");
            continue;
        }
        let report = run_storm(&engine, &store, &track, rasters)
            .await
            .with_context(|| format!("Storm {} failed", sid))?;
        info!(report = %serde_json::to_string(&report)?, "Storm report");
    }

    Ok(())
}
