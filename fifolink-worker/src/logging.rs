use fifolink::{LogConfig, LogFormat};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing on stderr. Stdout carries command output.
pub fn init_tracing(config: &LogConfig) {
    let json = config.format == LogFormat::Json;

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new(&config.filter))
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .try_init();
}
