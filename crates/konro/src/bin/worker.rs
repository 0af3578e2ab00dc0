//! Subprocess worker binary.
//!
//! Hosts one model instance and speaks the line-delimited frame protocol:
//! [`WorkerFrame`](konro::WorkerFrame) JSON lines on stdin, one JSON
//! response per line on stdout. Logs go to stderr so stdout stays clean.
//! Exits 0 after a shutdown frame or end of input, 1 on any failure.

use clap::Parser;
use konro::InstanceConfig;
use konro::worker::run_stdio_worker;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "konro-worker", version)]
struct Cli {
    /// Instance configuration as a JSON document
    #[arg(long)]
    config: String,

    /// Log filter, e.g. `info` or `konro=debug`
    #[arg(long, default_value = "warn")]
    log: String,
}

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log))
        .with_writer(std::io::stderr)
        .init();

    let config: InstanceConfig = match serde_json::from_str(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "unusable --config payload");
            std::process::exit(1);
        }
    };
    std::process::exit(run_stdio_worker(&config));
}
