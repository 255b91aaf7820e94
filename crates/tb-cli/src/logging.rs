use tracing_subscriber::EnvFilter;

use crate::config::LogFormatConfig;

/// Installs the global subscriber. `RUST_LOG` overrides the configured level.
/// Logs go to stderr so command output on stdout stays clean.
pub fn init(level: &str, format: LogFormatConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| build_filter(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = match format {
        LogFormatConfig::Json => builder.json().try_init(),
        LogFormatConfig::Pretty => builder.try_init(),
    };
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|e| {
        eprintln!("WARN: invalid log level {level:?} ({e}); falling back to 'info'");
        EnvFilter::new("info")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_directives() {
        assert_eq!(build_filter("debug").to_string(), "debug");
        assert!(build_filter("tb_cli=trace,warn")
            .to_string()
            .contains("tb_cli=trace"));
    }

    #[test]
    fn test_build_filter_falls_back_to_info() {
        assert_eq!(build_filter("tb_cli=notalevel").to_string(), "info");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init("info", LogFormatConfig::Pretty);
        init("debug", LogFormatConfig::Json);
    }
}
