// Copyright 2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

mod cli;
mod config;
mod error;
mod filter;
mod pipeline;
mod report;
mod runner;
mod stats;
mod table;
mod template;
mod ui;

use cli::Command;
use log::LevelFilter;

fn main() {
    // Parse CLI arguments
    let args = cli::CliArgs::parse_args();
    init_logging(args.verbose);

    // Validate arguments
    if let Err(e) = args.validate() {
        ui::print_error(&e);
        std::process::exit(1);
    }

    let outcome = match &args.command {
        Command::Process(process_args) => run_process(process_args, args.verbose),
        Command::Collect(collect_args) => run_collect(collect_args),
    };

    if let Err(e) = outcome {
        ui::print_error(&e.to_string());
        std::process::exit(1);
    }
}

/// `--verbose` shows debug output; otherwise RUST_LOG decides
fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(LevelFilter::Debug).format_timestamp(None).format_target(false);
    }
    builder.init();
}

fn run_process(args: &cli::ProcessArgs, verbose: bool) -> Result<(), error::DigestError> {
    let config = config::build_digest_config(args, verbose)?;
    let summary = pipeline::run(&config)?;

    println!("\nReport saved to: {}", config.report.display());
    if let Some(json) = &config.json {
        println!("JSON digest saved to: {}", json.display());
    }

    println!("\n=== Summary ===");
    println!("Processed: {}", summary.processed);
    println!("Skipped:   {}", summary.skipped.len());
    for path in &summary.skipped {
        println!("  - {}", path.display());
    }
    Ok(())
}

fn run_collect(args: &cli::CollectArgs) -> Result<(), error::DigestError> {
    let plan = config::build_collect_plan(args)?;

    runner::run_collect(&plan, |index, result| {
        println!("{}) Execution of {} terminated.", index, result.task.executable.display());
        println!("Results written at {}", result.task.output.display());
    })?;

    println!("Finished.");
    Ok(())
}
