mod client;
mod events;

pub use client::OpenCodeClient;
pub use events::{parse_event_line, Event};
