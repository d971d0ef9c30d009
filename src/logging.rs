//! Console logging for the viewer and demos.
//!
//! The library itself only emits `log` records; binaries call [`setup`] once.
//! Adjust verbosity with `RUST_LOG`, e.g. `RUST_LOG=flowfield=trace`.

use std::io::Write;

use flexi_logger::{DeferredNow, FlexiLoggerError, Logger, LoggerHandle, Record};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_SPEC: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Start logging to stderr. Keep the returned handle alive for the run.
pub fn setup() -> Result<LoggerHandle, FlexiLoggerError> {
    setup_with(DEFAULT_SPEC)
}

pub fn setup_with(spec: &str) -> Result<LoggerHandle, FlexiLoggerError> {
    let handle = Logger::try_with_env_or_str(spec)?
        .format(compact_format)
        .start()?;
    log::debug!("logging started, default spec \"{spec}\"");
    Ok(handle)
}

/// `LEVEL [time] [module:line] message`
pub fn compact_format(
    w: &mut dyn Write,
    now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{:<5} [{}] [{}:{}] {}",
        record.level(),
        now.format("%H:%M:%S%.3f"),
        record.module_path().unwrap_or("<unnamed>"),
        record.line().unwrap_or(0),
        record.args()
    )
}
