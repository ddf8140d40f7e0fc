use anyhow::Result;
use env_logger::{Builder, Target};
use std::fs::File;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock time as epoch milliseconds, the unit used on the wire.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Set up `env_logger`: Debug in debug builds, Info in release, `RUST_LOG`
/// on top. With `log_file` set, output goes there instead of stderr.
pub fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder = Builder::new();

    #[cfg(debug_assertions)]
    builder.filter_level(log::LevelFilter::Debug);
    #[cfg(not(debug_assertions))]
    builder.filter_level(log::LevelFilter::Info);

    builder.parse_default_env();

    if let Some(path) = log_file {
        builder.target(Target::Pipe(Box::new(File::create(path)?)));
    }

    builder.try_init()?;
    Ok(())
}
