use async_trait::async_trait;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

use super::title::WindowRenamer;

/// Failure of a single tmux invocation
#[derive(Debug, Error)]
pub enum TmuxError {
    #[error("failed to execute {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("tmux {command} exited with {status}: {stderr}")]
    Failed {
        command: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Client for interacting with tmux via CLI
pub struct TmuxClient {
    /// Path to tmux binary
    tmux_path: String,
}

impl TmuxClient {
    pub fn new() -> Self {
        Self::with_binary("tmux")
    }

    pub fn with_binary(tmux_path: impl Into<String>) -> Self {
        Self {
            tmux_path: tmux_path.into(),
        }
    }

    /// Rename the window this process lives in.
    ///
    /// The name is passed as its own argv entry, tmux never sees it through a shell.
    pub async fn rename_window(&self, name: &str) -> Result<(), TmuxError> {
        let output = Command::new(&self.tmux_path)
            .args(["rename-window", name])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| TmuxError::Spawn {
                binary: self.tmux_path.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(TmuxError::Failed {
                command: "rename-window",
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

impl Default for TmuxClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WindowRenamer for TmuxClient {
    async fn rename(&self, title: &str) -> Result<(), TmuxError> {
        self.rename_window(title).await
    }
}
