//! Turns `src<TAB>dst` capture lines into observations.
//!
//! Lines come either from a tshark child process printing `ip.src` and
//! `ip.dst` fields, or from standard input in the same format.

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use geotrace_core::config::{CaptureConfig, CaptureSource};
use geotrace_core::Observation;

/// Run the configured capture source until its output ends.
pub async fn capture_loop(config: CaptureConfig, tx: mpsc::Sender<Observation>) -> Result<()> {
    match config.source {
        CaptureSource::Stdin => {
            tracing::info!("reading observations from stdin");
            let forwarded = forward_lines(BufReader::new(tokio::io::stdin()), &tx).await?;
            tracing::info!(forwarded, "stdin closed");
        }
        CaptureSource::Tshark => {
            let args = tshark_args(&config.interface);
            tracing::info!(command = %config.command, ?args, "starting capture");
            let mut child = Command::new(&config.command)
                .args(&args)
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .kill_on_drop(true)
                .spawn()
                .with_context(|| format!("failed to spawn {}", config.command))?;

            let stdout = child
                .stdout
                .take()
                .context("capture process has no stdout")?;
            let forwarded = forward_lines(BufReader::new(stdout), &tx).await?;

            let status = child.wait().await.context("failed to wait for capture process")?;
            tracing::info!(forwarded, %status, "capture process exited");
        }
    }
    Ok(())
}

/// Arguments for a line-buffered tshark printing source and destination IPs.
pub fn tshark_args(interface: &str) -> Vec<String> {
    [
        "-i", interface, "-l", "-T", "fields", "-e", "ip.src", "-e", "ip.dst", "-Y", "ip",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Forward every complete line as an observation. Incomplete lines are
/// skipped. Returns how many observations were sent.
pub async fn forward_lines<R>(reader: R, tx: &mpsc::Sender<Observation>) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;
    while let Some(line) = lines.next_line().await.context("failed to read capture line")? {
        let Some(observation) = Observation::from_capture_line(&line) else {
            tracing::trace!(line = %line, "incomplete capture line skipped");
            continue;
        };
        if tx.send(observation).await.is_err() {
            tracing::info!("pipeline gone, capture stopping");
            break;
        }
        forwarded += 1;
    }
    Ok(forwarded)
}
