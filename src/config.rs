//! CLI argument structures, separated from the pipeline internals.

use clap::Parser;
use clap_verbosity_flag::Verbosity;

/// Global arguments shared by all commands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalArgs {
    /// Directory where change masks are persisted
    #[arg(long, default_value = crate::mask_store::DEFAULT_MASK_DIR, global = true)]
    pub mask_dir: String,

    /// Write the JSON result to a file instead of stdout
    #[arg(long, global = true)]
    pub output: Option<String>,

    /// Path to an ONNX change-detection model; when absent or unloadable,
    /// the deterministic difference engine is used
    #[arg(long, global = true)]
    pub model_path: Option<String>,

    /// Verbosity level (-q/--quiet, -v/-vv/-vvv for info/debug/trace)
    #[command(flatten)]
    pub verbosity: Verbosity,
}

/// Compare a pre/post image pair for changes.
#[derive(Parser, Debug, Clone)]
pub struct ChangeCommand {
    /// Pre-event image
    #[arg(value_name = "PRE_IMAGE")]
    pub pre_image: String,

    /// Post-event image
    #[arg(value_name = "POST_IMAGE")]
    pub post_image: String,
}

/// Estimate structural damage from a single image.
#[derive(Parser, Debug, Clone)]
pub struct EstimateCommand {
    /// Image to analyze
    #[arg(value_name = "IMAGE")]
    pub image: String,
}

/// Run change detection and estimation and fuse the results.
#[derive(Parser, Debug, Clone)]
pub struct ReportCommand {
    /// Pre-event image
    #[arg(value_name = "PRE_IMAGE")]
    pub pre_image: String,

    /// Post-event image (also used for single-image estimation)
    #[arg(value_name = "POST_IMAGE")]
    pub post_image: String,
}

/// Render a color heatmap from a stored change mask.
#[derive(Parser, Debug, Clone)]
pub struct HeatmapCommand {
    /// Mask filename to render; the most recent mask when omitted
    #[arg(long)]
    pub filename: Option<String>,
}

/// Retrieve a stored change mask as-is.
#[derive(Parser, Debug, Clone)]
pub struct MaskCommand {
    /// Mask filename to retrieve; the most recent mask when omitted
    #[arg(long)]
    pub filename: Option<String>,
}
