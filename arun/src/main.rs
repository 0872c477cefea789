mod config;
mod console;
mod parser;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arun_core::{OptionsBuilder, Program, Vm};
use clap::{Parser, Subcommand};

use crate::config::{AppConfig, AppConfigBuilder, LoggerConfig};
use crate::console::ConsoleHost;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON file with `options` and `logger_config`.
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Run images with a bad checksum or another version, after a warning.
    #[clap(short, long)]
    ignore_errors: bool,
    /// Deterministic random numbers and no overwrite confirmations.
    #[clap(short, long)]
    regression: bool,
    /// Log the image header and use deterministic random numbers.
    #[clap(short, long)]
    debug: bool,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print the header of a game image.
    Info { game: PathBuf },
    /// Play a game on the console.
    Run { game: PathBuf },
}

fn app_config(args: &Args) -> Result<AppConfig> {
    let config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let options = OptionsBuilder::new()
        .with_ignore_errors(args.ignore_errors || config.options.ignore_errors)
        .with_regression(args.regression || config.options.regression)
        .with_debug(args.debug || config.options.debug)
        .get();
    let logger_config = config.logger_config.clone().unwrap_or_default();
    Ok(AppConfigBuilder::from_config(config).with_options(options).with_logger_config(logger_config).get())
}

fn load(game: &Path, config: &AppConfig) -> Result<Program> {
    Program::load(game, &config.options).with_context(|| format!("loading {}", game.display()))
}

fn info(game: &Path, config: &AppConfig) -> Result<()> {
    let mut program = load(game, config)?;
    for warning in program.take_warnings() {
        log::warn!("{}", warning);
    }
    println!("{}: Alan {} image", game.display(), program.version());
    for (name, value) in program.header().fields() {
        println!("{:>24}: {:#010x} ({})", name, value, value);
    }
    Ok(())
}

fn run(game: &Path, config: &AppConfig) -> Result<()> {
    let program = load(game, config)?;
    let mut vm = Vm::new(program, ConsoleHost::new(game), config.options.clone())?;
    vm.set_save_file_name(game.with_extension("sav").to_string_lossy());
    vm.run()?;
    Ok(())
}

fn main() {
    let args = Args::parse();
    let config = match app_config(&args) {
        Ok(config) => config,
        Err(e) => {
            LoggerConfig::default().init();
            log::error!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.logger_config.clone().unwrap_or_default().init();

    let result = match &args.command {
        Cmd::Info { game } => info(game, &config),
        Cmd::Run { game } => run(game, &config),
    };
    if let Err(e) = result {
        log::error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
