//! # vf-runner
//!
//! Runs every enabled voting receiver from a JSON config and writes the
//! merged vote stream to stdout, one JSON object per line. Logs and operator
//! error reports go through `tracing` (stderr plus the optional log directory).
//!
//! # Usage
//!
//! ```bash
//! vf-runner config.json --log-level info
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use vf_core::sink::ErrorSink;
use vf_core::types::VoteEvent;
use vf_rx::VotingReceiver;

/// Chat voting receiver runner.
#[derive(Parser)]
#[command(name = "vf-runner", about = "Chat voting receiver runner")]
struct Cli {
    /// Configuration file path (JSON).
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output. Overrides `Voting.log_path`.
    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration; it names the log file
    let config = vf_core::config::load_config(&cli.config)?;

    // 2. Initialize logging
    let log_dir = cli.log_dir.clone().or_else(|| config.log_path());
    vf_core::logging::init_logging(&cli.log_level, log_dir.as_deref(), &config.module_name("vf-runner"));
    info!(
        "vf-runner starting: config={}, log_level={}, {} receiver(s) configured",
        cli.config.display(),
        cli.log_level,
        config.receivers.len()
    );

    // 3. Operator error reports
    let (sink, mut reports) = ErrorSink::channel();
    let reporter = tokio::spawn(async move {
        while let Some(msg) = reports.recv().await {
            warn!("[operator] {msg}");
        }
    });

    // 4. Create receivers
    let mut receivers: Vec<Box<dyn VotingReceiver>> = Vec::new();
    for (idx, rx_config) in config.enabled_receivers().enumerate() {
        match vf_rx::registry::create_receiver(rx_config, sink.clone()) {
            Ok(receiver) => {
                info!("receiver[{idx}]: created '{}'", receiver.name());
                receivers.push(receiver);
            }
            Err(e) => {
                error!("receiver[{idx}]: failed to create '{}': {e:#}", rx_config.platform);
            }
        }
    }
    if receivers.is_empty() {
        warn!("no receivers enabled");
    }

    // 5. Merge every vote stream into the stdout writer
    let (vote_tx, vote_rx) = mpsc::unbounded_channel::<VoteEvent>();
    for receiver in &receivers {
        let mut votes = receiver.subscribe();
        let vote_tx = vote_tx.clone();
        tokio::spawn(async move {
            while let Some(vote) = votes.recv().await {
                if vote_tx.send(vote).is_err() {
                    break;
                }
            }
        });
    }
    drop(vote_tx);
    let writer = tokio::spawn(write_votes(vote_rx));

    // 6. Initialize receivers
    for receiver in &mut receivers {
        let ok = receiver.init().await;
        info!("receiver '{}' init -> {ok} ({})", receiver.name(), receiver.state());
    }

    info!("{} receiver(s) running, press Ctrl+C to stop", receivers.len());

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    // 8. Stop all receivers; dropping them closes the vote and report channels
    for receiver in &mut receivers {
        info!("stopping receiver '{}'", receiver.name());
        receiver.stop().await;
    }
    drop(receivers);
    drop(sink);

    if let Err(e) = writer.await? {
        error!("vote writer failed: {e:#}");
    }
    let _ = reporter.await;

    info!("all receivers stopped");
    Ok(())
}

/// Write each vote to stdout as one JSON line.
async fn write_votes(mut votes: mpsc::UnboundedReceiver<VoteEvent>) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(vote) = votes.recv().await {
        let mut line = serde_json::to_vec(&vote)?;
        line.push(b'\n');
        stdout.write_all(&line).await?;
        stdout.flush().await?;
    }
    Ok(())
}
