mod client;
pub mod title;

pub use client::{TmuxClient, TmuxError};
pub use title::WindowTitleDriver;

/// Environment variable tmux sets for every process running inside it
pub const TMUX_ENV: &str = "TMUX";

/// Check whether this process runs inside a tmux session
pub fn is_inside_tmux() -> bool {
    std::env::var_os(TMUX_ENV).is_some_and(|value| !value.is_empty())
}
