use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::actions::Action;
use crate::config::EventSource;
use crate::opencode::{parse_event_line, OpenCodeClient};

/// Spawn the task that reads host events and forwards them as actions.
///
/// The task runs until the source ends or fails. Failures are logged here
/// and never retried; dropping the sender tells the reconciler intake is over.
pub fn spawn_intake(
    source: EventSource,
    client: OpenCodeClient,
    tx: mpsc::UnboundedSender<Action>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = match source {
            EventSource::Server => follow_server(&client, &tx).await,
            EventSource::Stdin => follow_lines(BufReader::new(tokio::io::stdin()), &tx).await,
        };

        match result {
            Ok(()) => tracing::info!(?source, "event stream ended"),
            Err(e) => tracing::error!(?source, "event stream failed: {:#}", e),
        }
    })
}

async fn follow_server(client: &OpenCodeClient, tx: &mpsc::UnboundedSender<Action>) -> Result<()> {
    client
        .follow_events(|event| tx.send(Action::from(event)).is_ok())
        .await
}

/// Forward one event per line until EOF
async fn follow_lines<R>(reader: R, tx: &mpsc::UnboundedSender<Action>) -> Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read event line")? {
        if let Some(event) = parse_event_line(&line) {
            if tx.send(Action::from(event)).is_err() {
                break;
            }
        }
    }
    Ok(())
}
