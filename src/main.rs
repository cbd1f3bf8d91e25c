mod cli;

use std::process::ExitCode;

use anyhow::Context;
use fat_inspector::config::InspectConfig;
use fat_inspector::image::DiskImage;
use fat_inspector::inspect::{inspect, InspectOptions};
use fat_inspector::logging;
use fat_inspector::report::Reporter;

use cli::{Args, Command};

const VERSION: &str = env!("APP_VERSION");

fn main() -> ExitCode {
    let args = match cli::parse(std::env::args().skip(1)) {
        Ok(Command::Inspect(args)) => args,
        Ok(Command::Help) => {
            print!("{}", cli::USAGE);
            return ExitCode::SUCCESS;
        }
        Ok(Command::Version) => {
            println!("fat-inspector {VERSION}");
            return ExitCode::SUCCESS;
        }
        Err(msg) => {
            eprintln!("error: {msg}\n\n{}", cli::USAGE);
            return ExitCode::from(2);
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    // Config discovery logs too; start from the default level until the
    // configured one is known.
    logging::init(logging::adjust_level(
        log::LevelFilter::Info,
        args.verbose,
        args.quiet,
    ));
    let mut config = match &args.config {
        Some(path) => InspectConfig::load_from_path(path)?,
        None => InspectConfig::load(),
    };
    args.apply_to(&mut config);

    logging::init(logging::adjust_level(
        config.log_level_filter(),
        args.verbose,
        args.quiet,
    ));
    log::info!("fat-inspector {VERSION}: {}", args.image.display());

    let mut image = DiskImage::open(&args.image)?;
    let report = inspect(&mut image, &InspectOptions::from(&config))?;

    let stdout = std::io::stdout().lock();
    Reporter::new(stdout, config.format)
        .write(&report)
        .context("failed to write report")
}
