//! Replay command - Emit JSON-lines raw events
//!
//! Each input line is one `RawEvent` in its JSON form. Events go to the
//! primary store only; the forwarders receive typed events, not raw ones.
//!
//! # Usage
//!
//! ```bash
//! tally replay --input events.jsonl
//! tally replay < events.jsonl
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use tally_config::Config;
use tally_pipeline::Emitter;
use tally_protocol::RawEvent;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Replay command arguments
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Input file, or `-` for stdin
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,
}

/// Counts from one replay
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Lines read, including blank ones
    pub lines: u64,
    pub emitted: u64,
    /// Lines that were not valid events
    pub skipped: u64,
    /// Events the emitter rejected
    pub failed: u64,
}

/// Run the replay command
pub async fn run(args: ReplayArgs, config: &Config) -> Result<()> {
    if !config.datastore.enabled {
        bail!("replay writes to the primary store: enable [datastore] in the config");
    }

    tracing::info!(destinations = ?config.active_destinations(), "starting replay");
    let emitter = Emitter::connect(config)
        .await
        .context("failed to start emitter")?;

    let result = match args.input.as_deref() {
        Some(path) if path != Path::new("-") => {
            let file = File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            replay(&emitter, BufReader::new(file)).await
        }
        _ => replay(&emitter, BufReader::new(tokio::io::stdin())).await,
    };

    // Whatever was accepted still gets delivered
    let flushed = emitter.flush().await;
    let closed = emitter.close().await;

    if let Some(writer) = emitter.datastore_writer() {
        let metrics = writer.metrics_snapshot();
        tracing::info!(
            received = metrics.events_received,
            written = metrics.events_written,
            batches = metrics.batches_written,
            errors = metrics.write_errors,
            "datastore writer totals"
        );
    }

    let summary = result?;
    println!(
        "replayed {} events ({} lines, {} skipped, {} failed)",
        summary.emitted, summary.lines, summary.skipped, summary.failed
    );

    flushed.context("flush failed")?;
    closed.context("close failed")?;
    Ok(())
}

/// Emit every event in `input`, skipping lines that do not parse
pub async fn replay<R>(emitter: &Emitter, input: R) -> Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = ReplaySummary::default();
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        summary.lines += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event = match RawEvent::from_json(line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(line = summary.lines, error = %e, "skipping malformed event");
                summary.skipped += 1;
                continue;
            }
        };

        match emitter.emit_raw(event).await {
            Ok(()) => summary.emitted += 1,
            Err(e) => {
                tracing::warn!(line = summary.lines, error = %e, "emit failed");
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        lines = summary.lines,
        emitted = summary.emitted,
        skipped = summary.skipped,
        failed = summary.failed,
        "replay finished"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::sync::Arc;
    use tally_sinks::testing::MemoryStore;

    async fn emitter(store: &MemoryStore) -> Emitter {
        let config = Config::from_str("[datastore]\nenabled = true\nflush_interval = \"1h\"").unwrap();
        Emitter::with_datastore(&config, Arc::new(store.clone()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_replay_emits_each_line() {
        let store = MemoryStore::new();
        let emitter = emitter(&store).await;
        let input = concat!(
            r#"{"distinct_id":"u1","event":"order_completed","order_id":"o1","revenue":19.99}"#,
            "\n\n",
            r#"{"distinct_id":"u2","event":"$pageview","url":"https://shop.example.com/"}"#,
            "\n",
        );

        let summary = replay(&emitter, input.as_bytes()).await.unwrap();
        emitter.close().await.unwrap();

        assert_eq!(
            summary,
            ReplaySummary {
                lines: 3,
                emitted: 2,
                skipped: 0,
                failed: 0,
            }
        );
        let rows = store.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].order_id, "o1");
        assert_eq!(rows[0].revenue, 199_900);
        assert_eq!(rows[1].url, "https://shop.example.com/");
    }

    #[tokio::test]
    async fn test_replay_skips_malformed_lines() {
        let store = MemoryStore::new();
        let emitter = emitter(&store).await;
        let input = "not json\n{\"distinct_id\":\"u1\",\"event\":\"signed_up\"}\n";

        let summary = replay(&emitter, input.as_bytes()).await.unwrap();
        emitter.close().await.unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.emitted, 1);
        assert_eq!(store.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_replay_counts_rejected_events() {
        let store = MemoryStore::new();
        let emitter = emitter(&store).await;
        emitter.close().await.unwrap();

        let input = "{\"distinct_id\":\"u1\",\"event\":\"signed_up\"}\n";
        let summary = replay(&emitter, input.as_bytes()).await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.emitted, 0);
    }
}
