//! Configuration for the host driver and for worker logging.

use std::path::PathBuf;
use std::time::Duration;

/// Host driver settings.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Parent directory for the per-session FIFO directory.
    pub fifo_root: PathBuf,
    /// How long to wait for a token before giving up. `None` waits forever,
    /// which is the bare protocol behaviour.
    pub ack_timeout: Option<Duration>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            fifo_root: std::env::temp_dir(),
            ack_timeout: None,
        }
    }
}

impl HostConfig {
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = Some(timeout);
        self
    }

    pub fn with_fifo_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.fifo_root = root.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Worker log settings, read from the environment.
///
/// - `RUST_LOG`: full filter directive, wins over everything else
/// - `FIFOLINK_LOG`: `debug`, `warn`/`warning`, `error`; anything else is `info`
/// - `LOG_FORMAT`: `json` for JSON lines, otherwise text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub filter: String,
    pub format: LogFormat,
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var("RUST_LOG").ok().as_deref(),
            std::env::var("FIFOLINK_LOG").ok().as_deref(),
            std::env::var("LOG_FORMAT").ok().as_deref(),
        )
    }

    fn from_vars(rust_log: Option<&str>, level: Option<&str>, format: Option<&str>) -> Self {
        let filter = match rust_log {
            Some(directive) => directive.to_string(),
            None => {
                let level = match level {
                    Some("debug") => "debug",
                    Some("warn") | Some("warning") => "warn",
                    Some("error") => "error",
                    _ => "info",
                };
                format!("fifolink={level},fifolink_worker={level}")
            }
        };

        let format = match format {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Self { filter, format }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_info_text() {
        let config = LogConfig::from_vars(None, None, None);
        assert_eq!(config.filter, "fifolink=info,fifolink_worker=info");
        assert_eq!(config.format, LogFormat::Text);
    }

    #[test]
    fn level_aliases() {
        let config = LogConfig::from_vars(None, Some("warning"), Some("json"));
        assert_eq!(config.filter, "fifolink=warn,fifolink_worker=warn");
        assert_eq!(config.format, LogFormat::Json);

        let config = LogConfig::from_vars(None, Some("verbose"), None);
        assert_eq!(config.filter, "fifolink=info,fifolink_worker=info");
    }

    #[test]
    fn rust_log_wins() {
        let config = LogConfig::from_vars(Some("trace"), Some("error"), None);
        assert_eq!(config.filter, "trace");
    }

    #[test]
    fn host_config_builders() {
        let config = HostConfig::default()
            .with_ack_timeout(Duration::from_secs(5))
            .with_fifo_root("/var/tmp");
        assert_eq!(config.ack_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.fifo_root, PathBuf::from("/var/tmp"));
        assert_eq!(HostConfig::default().ack_timeout, None);
    }
}
