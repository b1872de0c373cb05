use crate::config::Config;
use log::LevelFilter;
use simplelog::ConfigBuilder;

/// Target prefixes of HTTP stack crates. Their per-request chatter drowns out
/// connection and delivery logs, so they only show up at TRACE.
const FILTERED_MODULES: &[&str] = &["tower", "tower_http", "tracing", "hyper", "h2", "axum", "mio"];

pub struct Logger {}

impl Logger {
    /// Installs the global terminal logger.
    ///
    /// Fails if a logger is already installed for this process.
    pub fn init_logger(config: &Config) -> Result<(), log::SetLoggerError> {
        simplelog::TermLogger::init(
            config.log_level_filter,
            Self::build_log_config(config.log_level_filter != LevelFilter::Trace),
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        )
    }

    fn build_log_config(hide_http_stack: bool) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if hide_http_stack {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use log::{Level, Log, Record};
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Logs one record per target through `log_config` and returns the output.
    fn render(log_config: simplelog::Config, targets: &[&str]) -> String {
        let buffer = SharedBuffer::default();
        let logger = simplelog::WriteLogger::new(LevelFilter::Trace, log_config, buffer.clone());

        for target in targets {
            logger.log(
                &Record::builder()
                    .level(Level::Info)
                    .target(target)
                    .module_path(Some(target))
                    .args(format_args!("from {target}"))
                    .build(),
            );
        }
        logger.flush();

        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn http_stack_is_hidden_but_application_logs_are_kept() {
        let output = render(
            Logger::build_log_config(true),
            &["hyper::proto", "tower_http::cors", "sse::connection", "web::sse::handler"],
        );

        assert!(!output.contains("from hyper::proto"), "{output}");
        assert!(!output.contains("from tower_http::cors"), "{output}");
        assert!(output.contains("from sse::connection"), "{output}");
        assert!(output.contains("from web::sse::handler"), "{output}");
    }

    #[test]
    fn http_stack_is_shown_when_not_hiding() {
        let output = render(Logger::build_log_config(false), &["hyper::proto"]);
        assert!(output.contains("from hyper::proto"), "{output}");
    }

    #[test]
    fn second_install_returns_error_instead_of_panicking() {
        let config = Config::parse_from(["astrid", "--log-level-filter", "WARN"]);

        // The first install may already have happened elsewhere in this process.
        let _ = Logger::init_logger(&config);
        assert!(Logger::init_logger(&config).is_err());
    }
}
