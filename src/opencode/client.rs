use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::StatusCode;

use super::events::{parse_event_line, Event};
use crate::session::{LookupError, SessionLookup, SessionRecord};

/// HTTP client for the OpenCode server API
#[derive(Clone)]
pub struct OpenCodeClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenCodeClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch one session; `None` if the server does not know it
    pub async fn get_session(&self, id: &str) -> Result<Option<SessionRecord>, LookupError> {
        let response = self
            .client
            .get(format!("{}/session/{}", self.base_url, id))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(LookupError::Status(status)),
        }
    }

    /// Follow the global server-sent event stream, calling `on_event` for
    /// every parsed event. Returns when the server closes the stream or
    /// `on_event` returns false.
    pub async fn follow_events<F>(&self, on_event: F) -> Result<()>
    where
        F: FnMut(Event) -> bool,
    {
        let url = format!("{}/global/event", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("event stream returned {}: {}", status, body.trim());
        }

        forward_events(response.bytes_stream(), on_event).await
    }
}

#[async_trait]
impl SessionLookup for OpenCodeClient {
    async fn lookup(&self, id: &str) -> Result<Option<SessionRecord>, LookupError> {
        self.get_session(id).await
    }
}

/// Splits a byte stream into lines, keeping partial lines between chunks
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and return every line it completed
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Whatever is left once the stream ends without a final newline
    fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(&self.pending).into_owned())
    }
}

/// Parse events out of a chunked byte stream until it ends or `on_event` declines more
async fn forward_events<S, B, E, F>(stream: S, mut on_event: F) -> Result<()>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
    F: FnMut(Event) -> bool,
{
    futures_util::pin_mut!(stream);
    let mut buffer = LineBuffer::default();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Event stream read failed")?;
        for line in buffer.push(chunk.as_ref()) {
            if let Some(event) = parse_event_line(&line) {
                if !on_event(event) {
                    return Ok(());
                }
            }
        }
    }

    if let Some(event) = buffer.finish().as_deref().and_then(parse_event_line) {
        on_event(event);
    }
    Ok(())
}
