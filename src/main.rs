//! Binary entry point for frameart.
//!
//! Resolves one image from the selected source and pushes it to every
//! display given with `--tvip`.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for errors raised before logging is up
#![allow(clippy::print_stderr)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{ArgGroup, Parser};
use frameart::config::FrameConfig;
use frameart::device::{DirectoryConnector, parse_addresses};
use frameart::http::ReqwestFetcher;
use frameart::models::{MatteColor, MatteOption, MatteStyle, PhotoFilter, SourceName};
use frameart::observability::{self, LogFormat, LoggingConfig};
use frameart::services::{AcquisitionService, FrameService, RunOptions, RunSummary};
use frameart::sources::{SourceSelection, build_resolver};
use frameart::storage::Ledger;
use frameart::{Error, Normalizer};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Frameart - pushes wallpapers, photos and artworks to art-mode displays.
#[derive(Parser, Debug)]
#[command(name = "frameart")]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["bingwallpaper", "image", "unsplash", "google_art"])
))]
struct Cli {
    /// Display addresses, comma-separated.
    #[arg(long, env = "FRAMEART_TVIP")]
    tvip: String,

    /// Use a random (or `--date`) Bing 4K wallpaper.
    #[arg(long)]
    bingwallpaper: bool,

    /// Archive date for `--bingwallpaper` (YYYY-MM-DD).
    #[arg(long, requires = "bingwallpaper")]
    date: Option<String>,

    /// Use a local image file.
    #[arg(long, value_name = "PATH")]
    image: Option<String>,

    /// Use an Unsplash photo; random landscape photo without an id.
    #[arg(long, value_name = "PHOTO_ID", num_args = 0..=1, default_missing_value = "")]
    unsplash: Option<String>,

    /// Use a Google Arts & Culture asset; random asset without a reference.
    #[arg(long, value_name = "ASSET", num_args = 0..=1, default_missing_value = "")]
    google_art: Option<String>,

    /// Upload the same image to every display.
    #[arg(long)]
    same_image: bool,

    /// Photo filter to apply on the display.
    #[arg(long, value_name = "FILTER")]
    photo_filter: Option<PhotoFilter>,

    /// Matte style to apply on the display.
    #[arg(long, value_name = "STYLE")]
    matte: Option<MatteStyle>,

    /// Matte color (defaults to neutral when a style is given).
    #[arg(long, value_name = "COLOR")]
    matte_color: Option<MatteColor>,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,

    /// Save original and resized images for inspection.
    #[arg(long)]
    debugimage: bool,

    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log output format: pretty or json.
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,

    /// Append logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Root directory of the device stores.
    #[arg(long, env = "FRAMEART_DEVICE_ROOT", default_value = "frameart-devices")]
    device_root: PathBuf,
}

impl Cli {
    fn selection(&self) -> SourceSelection {
        if self.bingwallpaper {
            SourceSelection::new(SourceName::BingWallpaper, self.date.clone())
        } else if let Some(path) = &self.image {
            SourceSelection::new(SourceName::LocalImage, Some(path.clone()))
        } else if let Some(id) = &self.unsplash {
            SourceSelection::new(SourceName::Unsplash, Some(id.clone()))
        } else {
            SourceSelection::new(SourceName::GoogleArt, self.google_art.clone())
        }
    }

    fn run_options(&self) -> RunOptions {
        RunOptions {
            same_image: self.same_image,
            photo_filter: self.photo_filter,
            matte: (self.matte.is_some() || self.matte_color.is_some())
                .then(|| MatteOption::from_parts(self.matte, self.matte_color)),
        }
    }
}

/// Main entry point.
fn main() -> ExitCode {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config.with_env_overrides(),
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let logging = LoggingConfig {
        debug: cli.debug,
        format: cli.log_format,
        file: cli.log_file.clone(),
    };
    if let Err(e) = observability::init(&logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(&cli, config) {
        Ok(summary) => {
            tracing::info!(
                uploaded = summary.uploaded(),
                reused = summary.reused(),
                skipped = summary.skipped(),
                failed = summary.failed(),
                "Run complete"
            );
            ExitCode::SUCCESS
        },
        Err(e) => {
            if e.is_fatal() {
                tracing::error!(error = %e, "Aborting before any device was contacted");
            } else {
                tracing::error!(error = %e, "Run failed");
            }
            ExitCode::FAILURE
        },
    }
}

/// Builds the pipeline and runs it over every display.
fn run(cli: &Cli, config: FrameConfig) -> frameart::Result<RunSummary> {
    let devices = parse_addresses(&cli.tvip);
    if devices.is_empty() {
        return Err(Error::InvalidInput(
            "no display addresses specified, use --tvip".to_string(),
        ));
    }

    let selection = cli.selection();
    tracing::info!(source = %selection.source, selector = ?selection.selector(), "Selected source");

    let fetcher = Arc::new(ReqwestFetcher::new(config.http));
    let resolver = build_resolver(&selection, &config, fetcher)?;
    let ledger = Ledger::load(&config.ledger_path)?;
    let normalizer = Normalizer::new(config.target_width, config.target_height)
        .with_quality(config.jpeg_quality);

    let mut acquisition = AcquisitionService::new(resolver, ledger, normalizer);
    if cli.debugimage {
        acquisition = acquisition.with_debug_dir(config.debug_image_dir.clone());
    }

    let connector = DirectoryConnector::new(&cli.device_root);
    let mut service = FrameService::new(acquisition, &connector);
    service.run(&devices, selection.selector(), &cli.run_options())
}

/// Loads configuration.
fn load_config(path: Option<&std::path::Path>) -> frameart::Result<FrameConfig> {
    if let Some(config_path) = path {
        return FrameConfig::load_from_file(config_path);
    }

    // Environment override for config path
    if let Ok(config_path) = std::env::var("FRAMEART_CONFIG_PATH") {
        if !config_path.trim().is_empty() {
            return FrameConfig::load_from_file(std::path::Path::new(&config_path));
        }
    }

    Ok(FrameConfig::load_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("frameart").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_source_is_required_and_exclusive() {
        assert!(Cli::try_parse_from(["frameart", "--tvip", "10.0.0.5"]).is_err());
        assert!(
            Cli::try_parse_from(["frameart", "--tvip", "a", "--bingwallpaper", "--image", "x.jpg"])
                .is_err()
        );
    }

    #[test]
    fn test_optional_selectors() {
        let cli = parse(&["--tvip", "a", "--unsplash"]);
        assert_eq!(cli.selection(), SourceSelection::new(SourceName::Unsplash, None));

        let cli = parse(&["--tvip", "a", "--google-art", "https://x/asset/y/AbC123"]);
        assert_eq!(
            cli.selection().selector(),
            Some("https://x/asset/y/AbC123")
        );

        let cli = parse(&["--tvip", "a", "--bingwallpaper", "--date", "2023-05-01"]);
        assert_eq!(cli.selection().source, SourceName::BingWallpaper);
        assert_eq!(cli.selection().selector(), Some("2023-05-01"));
    }

    #[test]
    fn test_cosmetic_tokens() {
        let cli = parse(&[
            "--tvip",
            "a",
            "--image",
            "x.jpg",
            "--photo-filter",
            "ink",
            "--matte",
            "modern",
        ]);
        let options = cli.run_options();
        assert_eq!(options.photo_filter, Some(PhotoFilter::Ink));
        assert_eq!(options.matte.map(|m| m.token()).as_deref(), Some("modern_neutral"));

        assert!(
            Cli::try_parse_from(["frameart", "--tvip", "a", "--image", "x", "--matte", "bogus"])
                .is_err()
        );
    }

    #[test]
    fn test_no_cosmetics_by_default() {
        let options = parse(&["--tvip", "a,b", "--bingwallpaper", "--same-image"]).run_options();
        assert!(options.same_image);
        assert_eq!(options.matte, None);
        assert_eq!(options.photo_filter, None);
    }
}
