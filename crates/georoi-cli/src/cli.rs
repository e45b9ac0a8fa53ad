use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// georoi - regions of interest, Sentinel-2 statistics and conservation overlay
#[derive(Parser, Debug)]
#[command(name = "georoi")]
#[command(about = "Operator tooling for the georoi service", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Dotenv file layered under the process environment
    #[arg(long, global = true, default_value = ".env")]
    pub env_file: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check configuration, credentials and the reference dataset
    Doctor(DoctorArgs),

    /// Manage stored regions of interest
    Roi(RoiArgs),

    /// Overlay an ROI with the reference dataset and write the result
    Intersect(IntersectArgs),
}

#[derive(Parser, Debug)]
pub struct DoctorArgs {
    /// Also establish an Earth Engine session
    #[arg(long)]
    pub auth: bool,

    /// Show every resolved setting
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
pub struct RoiArgs {
    #[command(subcommand)]
    pub command: RoiCommand,
}

#[derive(Subcommand, Debug)]
pub enum RoiCommand {
    /// List stored ROIs
    List,

    /// Print a stored ROI
    Show {
        roi_id: String,
    },

    /// Create an ROI from a bounding box
    Bbox(BboxArgs),
}

#[derive(Parser, Debug)]
pub struct BboxArgs {
    #[arg(allow_negative_numbers = true)]
    pub min_lon: f64,

    #[arg(allow_negative_numbers = true)]
    pub min_lat: f64,

    #[arg(allow_negative_numbers = true)]
    pub max_lon: f64,

    #[arg(allow_negative_numbers = true)]
    pub max_lat: f64,

    /// ROI name (defaults to the generated id)
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Parser, Debug)]
pub struct IntersectArgs {
    pub roi_id: String,
}
