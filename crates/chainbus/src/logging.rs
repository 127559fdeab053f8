use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Every workspace crate logs under a `chainbus*` target.
const TARGET_PREFIX: &str = "chainbus";

/// `level` for the chainbus crates, warnings only for everything else.
fn targets(level: LogLevel) -> Targets {
    Targets::new()
        .with_default(LevelFilter::WARN)
        .with_target(TARGET_PREFIX, level.as_filter())
}

/// Route library `tracing` events to stderr so stdout stays machine-readable.
///
/// At debug and trace the emitting crate is shown, since a single frame
/// passes through the line, frame and node layers.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let filter = level.as_filter();
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(filter.max(LevelFilter::WARN))
        .with_ansi(false)
        .with_target(filter >= LevelFilter::DEBUG);

    let _ = match format {
        LogFormat::Text => builder.finish().with(targets(level)).try_init(),
        LogFormat::Json => builder.json().finish().with(targets(level)).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn level_applies_to_workspace_crates_only() {
        let filter = targets(LogLevel::Debug);
        assert!(filter.would_enable("chainbus_node::bus", &Level::DEBUG));
        assert!(filter.would_enable("chainbus", &Level::DEBUG));
        assert!(!filter.would_enable("chainbus_frame::queue", &Level::TRACE));
        assert!(!filter.would_enable("clap_builder", &Level::INFO));
        assert!(filter.would_enable("clap_builder", &Level::WARN));
    }

    #[test]
    fn error_level_still_silences_workspace_warnings() {
        let filter = targets(LogLevel::Error);
        assert!(!filter.would_enable("chainbus_node::registry", &Level::WARN));
        assert!(filter.would_enable("chainbus_node::registry", &Level::ERROR));
    }
}
