use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log line format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable, for terminals.
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG env var.
    pub log_level: Level,
    /// Per-module level overrides (e.g. "parley_llm" => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    pub format: OutputFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            format: OutputFormat::Pretty,
        }
    }
}

impl TelemetryConfig {
    /// Build a config from a level name, falling back to INFO for unknown names.
    pub fn from_level_name(level: &str, format: OutputFormat) -> Self {
        Self {
            log_level: level.parse().unwrap_or(Level::INFO),
            module_levels: Vec::new(),
            format,
        }
    }

    pub fn with_module_level(mut self, module: impl Into<String>, level: Level) -> Self {
        let module = module.into();
        if let Some(entry) = self.module_levels.iter_mut().find(|(m, _)| *m == module) {
            entry.1 = level;
        } else {
            self.module_levels.push((module, level));
        }
        self
    }

    /// Filter directive equivalent to this config, e.g. `info,parley_llm=debug`.
    pub fn filter_directive(&self) -> String {
        let mut filter_str = self.log_level.to_string().to_lowercase();
        for (module, level) in &self.module_levels {
            filter_str.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
        }
        filter_str
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Initialize the global tracing subscriber. Call once at startup.
///
/// Logs go to stderr so interactive stdout (the REPL) stays clean.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));

    let (json_layer, pretty_layer) = match config.format {
        OutputFormat::Json => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            ),
            None,
        ),
        OutputFormat::Pretty => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directive() {
        assert_eq!(TelemetryConfig::default().filter_directive(), "info");
    }

    #[test]
    fn module_levels_in_directive() {
        let config = TelemetryConfig::default()
            .with_module_level("parley_llm", Level::DEBUG)
            .with_module_level("tower_http", Level::WARN);
        assert_eq!(
            config.filter_directive(),
            "info,parley_llm=debug,tower_http=warn"
        );
    }

    #[test]
    fn module_level_replaced_not_duplicated() {
        let config = TelemetryConfig::default()
            .with_module_level("parley_server", Level::DEBUG)
            .with_module_level("parley_server", Level::TRACE);
        assert_eq!(config.module_levels.len(), 1);
        assert_eq!(config.filter_directive(), "info,parley_server=trace");
    }

    #[test]
    fn level_name_parsing() {
        let config = TelemetryConfig::from_level_name("debug", OutputFormat::Json);
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.format, OutputFormat::Json);

        let config = TelemetryConfig::from_level_name("loud", OutputFormat::Pretty);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn second_init_fails() {
        let config = TelemetryConfig::default();
        let _ = init_telemetry(&config);
        assert!(init_telemetry(&config).is_err());
    }
}
