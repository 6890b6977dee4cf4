use std::{
    env,
    path::PathBuf,
    process::ExitCode,
    time::Instant,
};

use clap::{Parser, Subcommand, ValueEnum, error::ErrorKind};
use worldmapper::{BatchReport, MapOptions, MapperError, init_log, run_map, run_merge};
use worldmapper_config::{LoadConfiguration, LoggingConfig, MapperConfiguration};

const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "worldmapper", version, about = "Remap block ids across a saved world")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Copy a world, rewriting blocks through a JSON mapping file
    Map {
        /// Source world directory
        src: PathBuf,
        /// JSON encoded mapping file
        map_file: PathBuf,
        /// Destination world directory, created when missing
        dest: PathBuf,
        /// Only process files that changed since the previous run
        mode: Option<MapMode>,
    },
    /// Overlay the chunks of one world onto another
    Merge {
        /// Source world directory
        src: PathBuf,
        /// Existing destination world directory
        dest: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MapMode {
    Update,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let exec_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = match MapperConfiguration::load(&exec_dir) {
        Ok(config) => config,
        Err(err) => {
            let _ = init_log(&LoggingConfig::default());
            log::error!("{err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_log(&config.logging) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    let time = Instant::now();
    log::info!("Starting worldmapper {CARGO_PKG_VERSION}");

    match run(cli.command, config.chunk.compression_level) {
        Ok(report) => {
            report.log();
            if report.has_failures() {
                log::warn!("Some files could not be converted, see the errors above");
            }
            log::info!("Done in {}ms", time.elapsed().as_millis());
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{err}");
            if err.is_fatal() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
    }
}

fn run(command: Command, compression_level: u32) -> Result<BatchReport, MapperError> {
    match command {
        Command::Map {
            src,
            map_file,
            dest,
            mode,
        } => {
            let options = MapOptions {
                update: matches!(mode, Some(MapMode::Update)),
                compression_level,
            };
            run_map(&src, &map_file, &dest, options)
        }
        Command::Merge { src, dest } => run_merge(&src, &dest, compression_level),
    }
}
