mod logging;
mod protocol;
mod worker;

use std::process;

use fifolink::{LogConfig, Session};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if let Err(msg) = parse_args(&args) {
        if !msg.is_empty() {
            eprintln!("error: {msg}");
            eprintln!();
        }
        eprintln!("Usage: fifolink-worker");
        eprintln!();
        eprintln!("Reads one JSON command per line on stdin. Acknowledgments are written");
        eprintln!("to the ack FIFO named by the on_traversal_start command.");
        eprintln!();
        eprintln!("Environment:");
        eprintln!("  FIFOLINK_LOG     debug, info, warn or error [default: info]");
        eprintln!("  LOG_FORMAT       json for JSON log lines");
        eprintln!("  RUST_LOG         full filter directive, overrides FIFOLINK_LOG");
        process::exit(2);
    }

    logging::init_tracing(&LogConfig::from_env());
    tracing::info!("fifolink-worker {}", env!("CARGO_PKG_VERSION"));

    let mut session = Session::new();
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();

    if let Err(e) = worker::run_worker(&mut session, stdin.lock(), &mut stdout.lock()) {
        tracing::error!(error = %e, "Worker failed");
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Result<(), String> {
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("fifolink-worker {}", env!("CARGO_PKG_VERSION"));
                process::exit(0);
            }
            "--help" | "-h" => return Err(String::new()),
            other => return Err(format!("unexpected argument: {other}")),
        }
    }
    Ok(())
}
