use std::{path::PathBuf, sync::Once};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::cli::LogArgs;

const LOG_FILE_PREFIX: &str = "cnft-burner";
/// Two days of hourly files.
const MAX_LOG_FILES: usize = 48;

static INIT: Once = Once::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    /// Directory of the rolling log files. `None` disables file logging.
    pub dir: Option<PathBuf>,
    pub verbose: bool,
}

impl From<&LogArgs> for LogOptions {
    fn from(args: &LogArgs) -> Self {
        Self {
            dir: (!args.no_log_file).then(|| args.log_dir.clone()),
            verbose: args.verbose,
        }
    }
}

/// Console filter when `RUST_LOG` is unset.
pub fn console_directives(verbose: bool) -> &'static str {
    if verbose {
        "info,cnft_burner=debug,cnft_client=debug"
    } else {
        "warn,cnft_burner=info"
    }
}

/// Console output goes to stderr, stdout carries listings, reports and JSON.
/// Burns are always logged at debug level to the file, whatever the console
/// shows.
pub fn setup_telemetry(options: &LogOptions) {
    INIT.call_once(|| {
        let console_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(console_directives(options.verbose)));
        let console_layer = fmt::Layer::new()
            .with_writer(std::io::stderr)
            .with_target(options.verbose)
            .with_filter(console_filter);

        let file_appender = options.dir.as_ref().and_then(|dir| {
            RollingFileAppender::builder()
                .rotation(Rotation::HOURLY)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix("log")
                .max_log_files(MAX_LOG_FILES)
                .build(dir)
                .map_err(|e| {
                    eprintln!(
                        "Warning: cannot write logs to {}: {}. Logging to the console only.",
                        dir.display(),
                        e
                    )
                })
                .ok()
        });

        let Some(file_appender) = file_appender else {
            tracing_subscriber::registry().with(console_layer).init();
            return;
        };
        let (writer, guard) = tracing_appender::non_blocking(file_appender);
        let file_layer = fmt::Layer::new()
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(EnvFilter::new(console_directives(true)));
        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .init();

        // Flushes on drop, and the subscriber lives as long as the process.
        std::mem::forget(guard);
    });
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    #[test]
    fn log_flags_are_global() {
        let cli = Cli::parse_from([
            "cnft-burner",
            "inspect",
            "--asset",
            "11111111111111111111111111111111",
            "--verbose",
            "--no-log-file",
        ]);
        let options = LogOptions::from(&cli.log);
        assert!(options.verbose);
        assert_eq!(options.dir, None);
    }

    #[test]
    fn logs_to_default_dir() {
        let cli = Cli::parse_from(["cnft-burner", "list", "--owner", "11111111111111111111111111111111"]);
        let options = LogOptions::from(&cli.log);
        assert!(!options.verbose);
        assert_eq!(options.dir, Some(PathBuf::from("logs")));
        assert_eq!(console_directives(false), "warn,cnft_burner=info");
    }
}
