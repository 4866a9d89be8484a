use clap::Parser;
use std::path::PathBuf;

struct DefaultArgs;

impl DefaultArgs {
    pub const DIR: &'static str = ".";
}

/// Distributed pairwise image matcher.
#[derive(Clone, Parser)]
#[command(name = "parmatch")]
#[command(about = "Match every image pair in DIR and write matches.init.txt (and matches.geo.txt).")]
pub struct Cli {
    /// Directory holding one .key feature file per image. Default: current directory.
    #[arg(value_name = "DIR", default_value = DefaultArgs::DIR)]
    pub dir: PathBuf,

    /// Worker thread count. Default: available parallelism minus one.
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    /// Run geometric verification (RANSAC homography) on each pair.
    #[arg(long, short = 'g', num_args = 0..=1, default_missing_value = "true", default_value = "true", value_parser = clap::value_parser!(bool))]
    pub geometry: bool,

    /// Lowe distance-ratio threshold for the nearest-neighbour test.
    #[arg(long, short = 'r')]
    pub ratio: Option<f32>,

    /// Verbose output with progress bars.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}
