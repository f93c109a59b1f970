//! Command line entry point for the translator conformance runner

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use std::path::Path;
use std::process;

use braille_tests::config::{Cli, Command, TestArgs, ValidateArgs};
use braille_tests::discovery;
use braille_tests::harness::HarnessBuilder;
use braille_tests::reporting::{self, TestReport, ViewOptions};
use braille_tests::FixtureLayout;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match dispatch(&cli) {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            for cause in e.chain().skip(1) {
                eprintln!("Caused by: {}", cause);
            }
            process::exit(1);
        }
    }
}

fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if debug {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn dispatch(cli: &Cli) -> Result<i32> {
    let layout = cli.fixture_layout().context("Failed to load fixture layout")?;
    let fixtures = cli.fixture_root()?;
    match &cli.command {
        Command::Test(args) => test(cli, args, &fixtures, layout),
        Command::Validate(args) => validate(cli, args, &fixtures, &layout),
        Command::List => list(cli, &fixtures, &layout),
    }
}

fn test(cli: &Cli, args: &TestArgs, fixtures: &Path, layout: FixtureLayout) -> Result<i32> {
    let program = args.program_config()?;
    let harness = HarnessBuilder::new(program, fixtures)
        .layout(layout)
        .timeout(args.timeout())
        .quiet(args.quiet)
        .build()?;

    let outcome = harness.run_all()?;
    let report = TestReport::new(&outcome.set, &outcome.skipped);
    let view = ViewOptions {
        render: cli.render_options(),
        details: args.details,
        show_passing: args.show_passing,
        diagnostics: args.error,
    };
    println!("{}", report.render(args.format, &view)?);

    Ok(if report.summary.all_passed() { 0 } else { 1 })
}

fn validate(
    cli: &Cli,
    args: &ValidateArgs,
    fixtures: &Path,
    layout: &FixtureLayout,
) -> Result<i32> {
    let found = discovery::discover(fixtures, layout)?;
    for skipped in &found.skipped {
        println!("Error in {}: {}", skipped.path.display(), skipped.error);
    }
    if !found.is_clean() {
        return Ok(1);
    }
    if args.verbose > 0 {
        print!(
            "{}",
            reporting::render_inventory(&found.set, args.verbose, cli.render_options().pretty)
        );
    }
    Ok(0)
}

fn list(cli: &Cli, root: &Path, layout: &FixtureLayout) -> Result<i32> {
    let (fixtures, skipped) = discovery::list(root, layout)?;
    print!("{}", reporting::render_listing(&fixtures, cli.render_options().pretty));
    for entry in &skipped {
        eprintln!("Skipping {}: {}", entry.path.display(), entry.error);
    }
    Ok(0)
}
