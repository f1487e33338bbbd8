use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::TmuxError;

/// Prefix shown in front of the title while the session waits for input
pub const WAITING_GLYPH: &str = "●";
/// Namespace prefix for session titles
pub const TITLE_PREFIX: &str = "oc-";
/// Title used when the working directory has no usable segment
pub const FALLBACK_TITLE: &str = "oc";

static RE_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").unwrap());

/// Replace everything outside `[A-Za-z0-9_-]` with `-`
pub fn sanitize(name: &str) -> String {
    RE_UNSAFE.replace_all(name, "-").into_owned()
}

/// Window title for an active session
pub fn render_title(display_name: &str, waiting: bool) -> String {
    let indicator = if waiting {
        format!("{} ", WAITING_GLYPH)
    } else {
        String::new()
    };
    format!("{}{}{}", indicator, TITLE_PREFIX, sanitize(display_name))
}

/// Last non-empty segment of the working directory
fn directory_name(directory: &str) -> Option<&str> {
    directory.split(['/', '\\']).filter(|s| !s.is_empty()).last()
}

/// Title shown when no session is active
pub fn reset_title(directory: &str) -> String {
    directory_name(directory).unwrap_or(FALLBACK_TITLE).to_string()
}

/// Title applied at startup, before any session is known
pub fn startup_title(directory: &str) -> String {
    let name = directory_name(directory).unwrap_or(FALLBACK_TITLE);
    format!("{} {}{}", WAITING_GLYPH, TITLE_PREFIX, name)
}

/// Something that can rename the current multiplexer window
#[async_trait]
pub trait WindowRenamer: Send + Sync {
    async fn rename(&self, title: &str) -> Result<(), TmuxError>;
}

/// Applies titles best-effort, skipping repeats of the last applied one
pub struct WindowTitleDriver {
    renamer: Box<dyn WindowRenamer>,
    enabled: bool,
    last_applied: Option<String>,
}

impl WindowTitleDriver {
    /// Driver that is active only when running inside tmux
    pub fn new(renamer: Box<dyn WindowRenamer>) -> Self {
        Self::with_enabled(renamer, super::is_inside_tmux())
    }

    pub fn with_enabled(renamer: Box<dyn WindowRenamer>, enabled: bool) -> Self {
        Self {
            renamer,
            enabled,
            last_applied: None,
        }
    }

    #[cfg(test)]
    pub fn last_applied(&self) -> Option<&str> {
        self.last_applied.as_deref()
    }

    /// Apply `title`. Never fails: a rename error only leaves the cache untouched.
    pub async fn apply(&mut self, title: &str) {
        if !self.enabled {
            return;
        }

        if self.last_applied.as_deref() == Some(title) {
            return;
        }

        match self.renamer.rename(title).await {
            Ok(()) => {
                tracing::debug!(title, "window renamed");
                self.last_applied = Some(title.to_string());
            }
            Err(e) => {
                tracing::debug!(title, error = %e, "window rename failed");
            }
        }
    }
}
