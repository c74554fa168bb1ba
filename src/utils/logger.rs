use chrono::Local;
use eyre::Result;
use fern::Dispatch;
use log::LevelFilter;

/// Sets up the application logger with console output.
///
/// The level comes from `RUST_LOG` and falls back to `Info` when the variable is
/// missing or not a plain level name.
///
/// # Errors
/// * If a global logger has already been installed
pub fn setup_logger() -> Result<()> {
    Dispatch::new()
        .level(level_from_env(std::env::var("RUST_LOG").ok().as_deref()))
        // Quiet the HTTP stack, it logs every connection at debug
        .level_for("hyper", LevelFilter::Warn)
        .level_for("reqwest", LevelFilter::Warn)
        .chain(std::io::stdout())
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                message
            ));
        })
        .apply()?;
    Ok(())
}

fn level_from_env(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::Info)
}
