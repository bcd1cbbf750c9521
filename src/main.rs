use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use env_logger::{Builder, Env};
use log::{error, info, Level};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

use resq::change_detection::ChangeDetector;
use resq::change_engine::load_change_model;
use resq::config::{
    ChangeCommand, EstimateCommand, GlobalArgs, HeatmapCommand, MaskCommand, ReportCommand,
};
use resq::errors::ResultStatus;
use resq::estimation::DamageEstimator;
use resq::fusion;
use resq::mask_store::MaskStore;
use resq::visualization;

#[derive(clap::Subcommand)]
enum Commands {
    /// Detect changes between a pre/post image pair
    Change(ChangeCommand),

    /// Estimate structural damage from a single image
    Estimate(EstimateCommand),

    /// Combined change detection + estimation report
    Report(ReportCommand),

    /// Render a color heatmap from a stored change mask
    Heatmap(HeatmapCommand),

    /// Retrieve a stored change mask
    Mask(MaskCommand),

    /// Show version information
    Version,
}

#[derive(Parser)]
#[command(name = "resq")]
#[command(about = "Rapid aerial damage assessment toolkit")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn get_log_level_from_verbosity(
    verbosity: &clap_verbosity_flag::Verbosity<clap_verbosity_flag::ErrorLevel>,
) -> log::LevelFilter {
    let adjusted_level = match verbosity.log_level_filter() {
        log::LevelFilter::Off => log::LevelFilter::Off,
        log::LevelFilter::Error => log::LevelFilter::Warn, // default -> WARN
        log::LevelFilter::Warn => log::LevelFilter::Info,  // -v -> INFO
        log::LevelFilter::Info => log::LevelFilter::Debug, // -vv -> DEBUG
        log::LevelFilter::Debug => log::LevelFilter::Trace, // -vvv -> TRACE
        log::LevelFilter::Trace => log::LevelFilter::Trace,
    };

    if verbosity.is_silent() {
        log::LevelFilter::Error // -q -> ERROR
    } else {
        adjusted_level
    }
}

fn init_logging(cli: &Cli) {
    // Honor RUST_LOG when the user didn't pass -v/-q.
    let use_env = !cli.global.verbosity.is_present() && std::env::var_os("RUST_LOG").is_some();

    let mut logger = if use_env {
        Builder::from_env(Env::default())
    } else {
        let mut b = Builder::new();
        b.filter_level(get_log_level_from_verbosity(&cli.global.verbosity));
        b
    };

    logger
        .format(|buf, record| {
            let level_str = match record.level() {
                Level::Error => "ERROR".red().bold().to_string(),
                Level::Warn => "WARN".yellow().to_string(),
                Level::Info => "INFO".green().to_string(),
                Level::Debug => "DEBUG".blue().to_string(),
                Level::Trace => "TRACE".magenta().to_string(),
            };
            writeln!(buf, "[{}] {}", level_str, record.args())
        })
        .init();
}

/// Print (or write) the JSON result; returns whether the result reported an
/// error status so the process can exit non-zero.
fn emit<T: Serialize>(global: &GlobalArgs, result: &T, status: ResultStatus) -> Result<bool> {
    let json = serde_json::to_string_pretty(result).context("failed to serialize result")?;
    match &global.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("failed to write {path}"))?;
            info!("Result written to {path}");
        }
        None => println!("{json}"),
    }
    Ok(status.is_error())
}

#[derive(Serialize)]
struct HeatmapResponse {
    status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    heatmap: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn resolve_mask(
    store: &MaskStore,
    filename: &Option<String>,
) -> Result<(String, image::GrayImage), resq::errors::PipelineError> {
    match filename {
        Some(name) => store.load(name).map(|mask| (name.clone(), mask)),
        None => store.latest(),
    }
}

fn run_heatmap(store: &MaskStore, cmd: &HeatmapCommand) -> HeatmapResponse {
    let result = resolve_mask(store, &cmd.filename).and_then(|(filename, mask)| {
        let heatmap = visualization::heatmap_from_mask(&mask)?;
        let png = visualization::encode_rgb_png(&heatmap)?;
        Ok((filename, visualization::to_data_uri(&png)))
    });

    match result {
        Ok((filename, heatmap)) => HeatmapResponse {
            status: ResultStatus::Success,
            heatmap: Some(heatmap),
            filename: Some(filename),
            error: None,
        },
        Err(e) => HeatmapResponse {
            status: ResultStatus::Error,
            heatmap: None,
            filename: None,
            error: Some(e.to_string()),
        },
    }
}

#[derive(Serialize)]
struct MaskResponse {
    status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    mask: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn run_mask(store: &MaskStore, cmd: &MaskCommand) -> MaskResponse {
    let result = resolve_mask(store, &cmd.filename).and_then(|(filename, mask)| {
        let png = visualization::encode_gray_as_rgb_png(&mask)?;
        Ok((filename, visualization::to_data_uri(&png)))
    });

    match result {
        Ok((filename, mask)) => MaskResponse {
            status: ResultStatus::Success,
            mask: Some(mask),
            filename: Some(filename),
            error: None,
        },
        Err(e) => MaskResponse {
            status: ResultStatus::Error,
            mask: None,
            filename: None,
            error: Some(e.to_string()),
        },
    }
}

fn read_image(path: &str) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read image file: {path}"))
}

fn run(cli: &Cli) -> Result<bool> {
    let mask_store = MaskStore::new(&cli.global.mask_dir);

    match &cli.command {
        Some(Commands::Change(cmd)) => {
            info!(
                "🛰️  Change detection: {} -> {}",
                cmd.pre_image, cmd.post_image
            );
            let model = load_change_model(cli.global.model_path.as_deref().map(Path::new));
            let detector = ChangeDetector::new(model, mask_store);
            let pre = read_image(&cmd.pre_image)?;
            let post = read_image(&cmd.post_image)?;
            let result = detector.detect(&pre, &post);
            emit(&cli.global, &result, result.status)
        }
        Some(Commands::Estimate(cmd)) => {
            info!("🏚️  Damage estimation: {}", cmd.image);
            let estimator = DamageEstimator::new();
            let bytes = read_image(&cmd.image)?;
            let result = estimator.estimate(&bytes);
            emit(&cli.global, &result, result.status)
        }
        Some(Commands::Report(cmd)) => {
            info!(
                "📋 Combined report: {} -> {}",
                cmd.pre_image, cmd.post_image
            );
            let model = load_change_model(cli.global.model_path.as_deref().map(Path::new));
            let detector = ChangeDetector::new(model, mask_store);
            let estimator = DamageEstimator::new();

            let pre = read_image(&cmd.pre_image)?;
            let post = read_image(&cmd.post_image)?;

            let change = detector.detect(&pre, &post);
            let estimation = estimator.estimate(&post);
            let report = fusion::fuse(&change, &estimation);
            emit(&cli.global, &report, report.status)
        }
        Some(Commands::Heatmap(cmd)) => {
            let response = run_heatmap(&mask_store, cmd);
            emit(&cli.global, &response, response.status)
        }
        Some(Commands::Mask(cmd)) => {
            let response = run_mask(&mask_store, cmd);
            emit(&cli.global, &response, response.status)
        }
        Some(Commands::Version) => {
            println!("resq v{}", env!("CARGO_PKG_VERSION"));
            println!("Repository: {}", env!("CARGO_PKG_REPOSITORY"));
            Ok(false)
        }
        None => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            cmd.print_help()?;
            Ok(false)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(reported_error) => {
            if reported_error {
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ {e:#}");
            std::process::exit(1);
        }
    }
}
