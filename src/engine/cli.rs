//! CLI command handler: run the full match pipeline over a directory.

use anyhow::Result;
use log::{debug, info};

use crate::Opts;
use crate::engine::arg_parser::Cli;
use crate::features::matcher::NN_RATIO;
use crate::match_dir_with_opts;
use crate::utils::setup_logging;

fn setup_opts(cli: &Cli) -> Opts {
    let verbose = cli.verbose.unwrap_or(false);
    setup_logging(verbose);
    Opts {
        num_workers: cli.workers,
        with_geometry: cli.geometry,
        ratio: cli.ratio.unwrap_or(NN_RATIO),
        verbose,
    }
}

/// Match every pair of images under `cli.dir` and write the output files
/// into the same directory.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = setup_opts(cli);
    debug!("matching directory {:?}", cli.dir);
    let summary = match_dir_with_opts(&cli.dir, &opts)?;
    info!(
        "{} images, {} pair tasks, {} records written",
        summary.items, summary.tasks, summary.records
    );
    Ok(())
}
