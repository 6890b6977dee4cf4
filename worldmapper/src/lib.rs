use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use worldmapper_config::LoggingConfig;

pub mod batch;
pub mod error;

pub use batch::{BatchReport, MapOptions, run_map, run_merge};
pub use error::MapperError;

/// Installs the terminal logger. Does nothing when logging is disabled.
pub fn init_log(config: &LoggingConfig) -> Result<(), MapperError> {
    if !config.enabled {
        return Ok(());
    }

    let mut builder = ConfigBuilder::new();
    if config.timestamp {
        builder.set_time_format_custom(time::macros::format_description!(
            "[hour]:[minute]:[second]"
        ));
    } else {
        builder.set_time_level(LevelFilter::Off);
    }
    if config.threads {
        builder.set_thread_level(LevelFilter::Info);
    } else {
        builder.set_thread_level(LevelFilter::Off);
    }
    builder.set_target_level(LevelFilter::Off);

    let color = if config.color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    TermLogger::init(
        config.level_filter(),
        builder.build(),
        TerminalMode::Mixed,
        color,
    )?;
    Ok(())
}
