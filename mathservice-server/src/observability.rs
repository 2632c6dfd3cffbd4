//! Log output for the math service.
//!
//! Logs go to stdout. In the default [`LogFormat::Json`] format, every event is rendered by
//! [`SortedJson`] as one JSON object per line.

use std::collections::BTreeMap;
use std::env;
use std::error::Error;
use std::fmt;
use std::time::SystemTime;

use serde_json::{Number, Value};
use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, prelude::*};

use crate::config::{Config, LogFormat};

/// Field name under which the event message is rendered.
const EVENT_KEY: &str = "event";

/// Initializes the global tracing subscriber according to the logging configuration.
pub fn init_tracing(config: &Config) {
    let (level, env_filter) = parse_rust_log(config.logging.level);

    let format = match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .event_format(SortedJson)
            .with_writer(std::io::stdout)
            .with_filter(level)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(std::io::stdout)
            .with_filter(level)
            .boxed(),
        LogFormat::Simplified => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stdout)
            .with_filter(level)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(format)
        .with(env_filter)
        .init();
}

/// Resolves the effective level and the per-crate filter.
///
/// `RUST_LOG` takes precedence over the configured level. If it is a plain level, it replaces the
/// configured one. Otherwise, it is used literally as a filter directive.
pub fn parse_rust_log(configured: LevelFilter) -> (LevelFilter, EnvFilter) {
    let level = match env::var(EnvFilter::DEFAULT_ENV) {
        Ok(value) => match value.parse::<Level>() {
            Ok(level) => LevelFilter::from_level(level),
            Err(_) => return (LevelFilter::TRACE, EnvFilter::new(value)),
        },
        Err(_) => configured,
    };

    // This is the maximum verbosity that will be logged, we filter this down to `level`.
    let env_filter = EnvFilter::new(
        "INFO,\
        tower_http=TRACE,\
        mathservice_server=TRACE,\
        ",
    );

    (level, env_filter)
}

/// An event formatter that renders one JSON object per line with alphabetically sorted keys.
///
/// Every object contains:
///
///  - `event`: the log message
///  - `level`: the lowercase severity, e.g. `info`
///  - `logger`: the tracing target, usually the module path
///  - `timestamp`: an RFC 3339 timestamp in UTC with microsecond precision
///
/// All other fields of the event are added under their own name. Span fields are not included.
#[derive(Clone, Copy, Debug, Default)]
pub struct SortedJson;

impl<S, N> FormatEvent<S, N> for SortedJson
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut record = BTreeMap::new();
        event.record(&mut FieldVisitor(&mut record));

        let metadata = event.metadata();
        record.insert(
            "level".to_owned(),
            Value::from(metadata.level().as_str().to_ascii_lowercase()),
        );
        record.insert("logger".to_owned(), Value::from(metadata.target()));
        record.insert(
            "timestamp".to_owned(),
            Value::from(humantime::format_rfc3339_micros(SystemTime::now()).to_string()),
        );

        let line = serde_json::to_string(&record).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}

/// Collects event fields into a JSON map.
struct FieldVisitor<'a>(&'a mut BTreeMap<String, Value>);

impl FieldVisitor<'_> {
    fn insert(&mut self, field: &Field, value: Value) {
        let key = match field.name() {
            "message" => EVENT_KEY,
            name => name,
        };
        self.0.insert(key.to_owned(), value);
    }
}

impl Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        // JSON has no representation for NaN and infinities.
        let value = Number::from_f64(value)
            .map_or_else(|| Value::from(value.to_string()), Value::Number);
        self.insert(field, value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        self.insert(field, Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::from(format!("{value:?}")));
    }
}

/// Captures events rendered by [`SortedJson`] on the current thread.
///
/// Events are captured until the value is dropped. Async tests must run on a current-thread
/// runtime so that all tasks emit on the capturing thread.
#[cfg(test)]
pub(crate) struct CapturedLogs {
    buffer: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
    _guard: tracing::subscriber::DefaultGuard,
}

#[cfg(test)]
impl CapturedLogs {
    pub fn start() -> Self {
        let buffer = std::sync::Arc::<std::sync::Mutex<Vec<u8>>>::default();
        let writer = CaptureWriter(buffer.clone());

        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .event_format(SortedJson)
                .with_writer(move || writer.clone()),
        );
        let guard = tracing::subscriber::set_default(subscriber);

        Self {
            buffer,
            _guard: guard,
        }
    }

    /// All output lines captured so far.
    pub fn lines(&self) -> Vec<String> {
        let bytes = self.buffer.lock().unwrap().clone();
        let output = String::from_utf8(bytes).unwrap();
        output.lines().map(str::to_owned).collect()
    }

    /// All records captured so far, parsed from their JSON lines.
    pub fn records(&self) -> Vec<Value> {
        self.lines()
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

#[cfg(test)]
#[derive(Clone)]
struct CaptureWriter(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl std::io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
