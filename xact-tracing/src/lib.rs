//! Process-entry logging setup (§6, §11 of the design document): a single
//! write-once initialization of the global `tracing` subscriber, combining
//! a stdout layer with an optional rolling file layer scoped to
//! `cfg.host.<id>.log_level` / `cfg.host.<id>.log_dir`.
//!
//! This is the one crate allowed to touch process-wide logging state
//! (Design Notes, "Global mutable state") — every other crate only ever
//! emits `tracing::info!`/`warn!`/`error!` and never configures a
//! subscriber itself.

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();
static FILE_GUARD: Mutex<Option<WorkerGuard>> = Mutex::new(None);

/// One process-entry point's logging configuration.
pub struct LoggingConfig<'a> {
    pub log_level: &'a str,
    pub log_dir: Option<&'a Path>,
    pub file_name: &'a str,
}

/// Initialize the global subscriber exactly once per process; later calls
/// are no-ops. Safe to call from every entry point (`xact-cli`'s `main`,
/// each spawned per-process child, each host agent) without risking a
/// double-init panic.
pub fn init(cfg: LoggingConfig<'_>) {
    INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_new(cfg.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
        let stdout_layer = tracing_subscriber::fmt::layer();

        let file_layer = cfg.log_dir.map(|dir| {
            let _ = std::fs::create_dir_all(dir);
            // `tracing-appender` only rotates on a calendar boundary
            // (hourly/daily/never), not by byte count. A true 100 MB cap
            // would need a custom `MakeWriter` tracking bytes written;
            // `never` plus external logrotate is the stand-in here.
            let appender = tracing_appender::rolling::never(dir, cfg.file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            *FILE_GUARD.lock() = Some(guard);
            tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false)
        });

        tracing_subscriber::registry().with(env_filter).with(stdout_layer).with(file_layer).init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent_across_repeated_calls() {
        init(LoggingConfig { log_level: "warn", log_dir: None, file_name: "unused.log" });
        init(LoggingConfig { log_level: "debug", log_dir: None, file_name: "unused.log" });
    }
}
