use anyhow::Result;
use tokio::sync::mpsc;

mod actions;
mod app;
mod config;
mod intake;
mod opencode;
mod session;
mod tmux;

use actions::Action;
use app::App;
use config::Config;
use opencode::OpenCodeClient;
use tmux::{TmuxClient, WindowTitleDriver};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stderr keeps stdout free
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    if !tmux::is_inside_tmux() {
        tracing::info!("not running inside tmux, window titles will not be changed");
    }

    // Create action channel
    let (tx, mut rx) = mpsc::unbounded_channel::<Action>();

    let client = OpenCodeClient::new(&config.server_url);
    let intake = intake::spawn_intake(config.source, client.clone(), tx);

    let driver = WindowTitleDriver::new(Box::new(TmuxClient::with_binary(&config.tmux_path)));
    let mut app = App::new(driver, Box::new(client), config.directory);
    app.start().await;

    // Main event loop: one action at a time, each handled to completion
    loop {
        let action = tokio::select! {
            action = rx.recv() => action.unwrap_or(Action::Shutdown),
            _ = tokio::signal::ctrl_c() => Action::Shutdown,
        };

        if app.handle_action(action).await {
            break;
        }
    }

    intake.abort();
    Ok(())
}
