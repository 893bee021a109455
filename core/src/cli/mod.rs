pub mod report;

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for heimdallr
#[derive(Parser, Debug)]
#[command(name = "heimdallr")]
#[command(about = "Quantitative metrics from CT/MR segmentation masks")]
#[command(version)]
pub struct Cli {
    /// Case folder containing total/, tissue_types/, bleed/ and id.json
    #[arg(value_name = "CASE_DIR")]
    pub case_dir: PathBuf,

    /// Intensity volume (NIfTI)
    #[arg(value_name = "VOLUME")]
    pub volume: PathBuf,

    /// Case identifier (defaults to the case folder name)
    #[arg(long)]
    pub case_id: Option<String>,

    /// DICOM file to read modality and kVp from instead of id.json
    #[arg(long, value_name = "FILE")]
    pub dicom: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Write the JSON result to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Directory for overlay images (defaults to the case folder)
    #[arg(long, value_name = "DIR")]
    pub overlay_dir: Option<PathBuf>,

    /// Skip overlay rendering
    #[arg(long)]
    pub no_overlays: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON format
    Json,
}
