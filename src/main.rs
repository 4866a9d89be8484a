//! Parmatch CLI: match every image pair in a directory of .key feature files.

use anyhow::Result;
use clap::Parser;
use parmatch::engine::arg_parser::Cli;
use parmatch::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
