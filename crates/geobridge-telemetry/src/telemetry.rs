use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use fastrace::collector::{Config, ConsoleReporter, Reporter, SpanRecord};
use geobridge_common::config::TelemetryConfig;
use log::{debug, LevelFilter};

use crate::error::{TelemetryError, TelemetryResult};
use crate::loggers::composite::CompositeLogger;
use crate::loggers::span::SpanEventLogger;

enum TelemetryStatus {
    Uninitialized,
    Initialized,
    Failed,
    Finalized,
}

/// Trace records are too chatty to attach to spans.
const SPAN_EVENT_LEVEL: LevelFilter = LevelFilter::Debug;

static TELEMETRY_STATUS: Mutex<TelemetryStatus> = Mutex::new(TelemetryStatus::Uninitialized);

/// Installs the process-wide logger and span reporter.
///
/// This can succeed at most once per process.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    let mut status = TELEMETRY_STATUS
        .lock()
        .map_err(|e| TelemetryError::internal(e.to_string()))?;

    match *status {
        TelemetryStatus::Uninitialized => {
            match init_traces(config).and_then(|()| init_logs(config)) {
                Ok(()) => {
                    debug!("telemetry initialized");
                    *status = TelemetryStatus::Initialized;
                    Ok(())
                }
                Err(e) => {
                    *status = TelemetryStatus::Failed;
                    Err(e)
                }
            }
        }
        TelemetryStatus::Initialized => {
            Err(TelemetryError::internal("telemetry already initialized"))
        }
        TelemetryStatus::Failed => Err(TelemetryError::internal(
            "telemetry failed to initialize previously",
        )),
        TelemetryStatus::Finalized => Err(TelemetryError::internal(
            "telemetry has been finalized and cannot be re-initialized",
        )),
    }
}

fn init_traces(config: &TelemetryConfig) -> TelemetryResult<()> {
    if config.trace_to_console {
        fastrace::set_reporter(ConsoleReporter, Config::default());
    } else {
        let reporter_config = Config::default().report_interval(Duration::MAX);
        fastrace::set_reporter(NoOpReporter, reporter_config);
    }
    Ok(())
}

fn init_logs(config: &TelemetryConfig) -> TelemetryResult<()> {
    if config.default_log_filter.trim().is_empty() {
        return Err(TelemetryError::invalid("empty default log filter"));
    }
    let primary = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.default_log_filter.as_str()),
    )
    .format(move |buf, record| {
        let level = record.level();
        let target = record.target();
        let style = buf.default_level_style(level);
        let timestamp = buf.timestamp();
        let args = record.args();
        writeln!(buf, "[{timestamp} {style}{level}{style:#} {target}] {args}")
    })
    .build();
    let max_level = primary.filter();

    let mut logger = CompositeLogger::new(Box::new(primary));
    if config.trace_to_console {
        logger = logger.with_tap(SPAN_EVENT_LEVEL, Box::new(SpanEventLogger));
    }

    log::set_boxed_logger(Box::new(logger))
        .map_err(|e| TelemetryError::internal(e.to_string()))?;
    log::set_max_level(max_level);
    Ok(())
}

pub fn shutdown_telemetry() {
    debug!("shutting down telemetry");
    fastrace::flush();
    log::logger().flush();
    if let Ok(mut status) = TELEMETRY_STATUS.lock() {
        if let TelemetryStatus::Initialized = *status {
            *status = TelemetryStatus::Finalized;
        }
    }
}

/// A fastrace reporter that does nothing.
pub struct NoOpReporter;

impl Reporter for NoOpReporter {
    fn report(&mut self, _spans: Vec<SpanRecord>) {}
}
