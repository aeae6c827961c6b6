//! The run context threaded through every batch call.

use crate::config::BatchConfig;
use crate::engine::ConversionEngine;
use crate::logs::ErrorLog;
use crate::progress::{BatchProgressCallback, NoopProgressCallback};

static NOOP_PROGRESS: NoopProgressCallback = NoopProgressCallback;

/// Configuration, engine and error logs for one run.
///
/// Built once at the top level; the batch driver and the directory walker only
/// ever borrow it.
pub struct BatchContext<E: ConversionEngine> {
    config: BatchConfig,
    engine: E,
    error_log: ErrorLog,
}

impl<E: ConversionEngine> BatchContext<E> {
    pub fn new(config: BatchConfig, engine: E) -> Self {
        let error_log = ErrorLog::new(&config.error_log, &config.error_paths_log);
        Self {
            config,
            engine,
            error_log,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    /// The configured progress callback, or a no-op.
    pub fn progress(&self) -> &dyn BatchProgressCallback {
        self.config
            .progress_callback
            .as_deref()
            .unwrap_or(&NOOP_PROGRESS)
    }

    /// Give back the engine, e.g. to inspect it after a run.
    pub fn into_engine(self) -> E {
        self.engine
    }
}
