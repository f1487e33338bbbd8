use crate::actions::Action;
use crate::opencode::Event;
use crate::session::policy::Resolution;
use crate::session::{ActivationPolicy, SessionLookup, SessionRecord, SessionRegistry};
use crate::tmux::title::{render_title, reset_title, startup_title};
use crate::tmux::WindowTitleDriver;

/// Event reconciler: owns all session state and keeps the window title in sync
pub struct App {
    /// Top-level sessions seen so far
    pub registry: SessionRegistry,
    /// Active session and waiting flag
    pub policy: ActivationPolicy,
    driver: WindowTitleDriver,
    lookup: Box<dyn SessionLookup>,
    /// Working directory, used for the idle title
    directory: String,
}

impl App {
    pub fn new(
        driver: WindowTitleDriver,
        lookup: Box<dyn SessionLookup>,
        directory: impl Into<String>,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(),
            policy: ActivationPolicy::new(),
            driver,
            lookup,
            directory: directory.into(),
        }
    }

    /// Title currently shown, if any was applied
    #[cfg(test)]
    pub fn current_title(&self) -> Option<&str> {
        self.driver.last_applied()
    }

    /// Show the startup title before any session is known
    pub async fn start(&mut self) {
        let title = startup_title(&self.directory);
        self.driver.apply(&title).await;
    }

    /// Handle an action and return whether to quit
    pub async fn handle_action(&mut self, action: Action) -> bool {
        match action {
            Action::Event(event) => {
                self.handle_event(event).await;
                false
            }
            Action::ChatMessage { session_id } => {
                self.on_chat_message(&session_id).await;
                false
            }
            Action::Shutdown => {
                self.teardown().await;
                true
            }
        }
    }

    pub async fn handle_event(&mut self, event: Event) {
        match event {
            Event::SessionCreated(info) => {
                if !self.track(info.clone()) {
                    return;
                }
                if self.policy.on_created(&info.id) {
                    tracing::info!(session = %info.id, "session activated");
                    self.refresh_title().await;
                }
            }
            Event::SessionUpdated(info) => {
                let tracked = self.track(info.clone());
                if !self.policy.is_active(&info.id) {
                    return;
                }
                if tracked {
                    self.refresh_title().await;
                } else {
                    tracing::info!(session = %info.id, "active session became a sub-agent");
                    self.policy.deactivate();
                    self.show_reset_title().await;
                }
            }
            Event::SessionDeleted(info) => {
                self.registry.remove(&info.id);
                if self.policy.is_active(&info.id) {
                    tracing::info!(session = %info.id, "active session deleted");
                    self.policy.deactivate();
                    self.show_reset_title().await;
                }
            }
            Event::SessionIdle { session_id }
            | Event::PermissionAsked { session_id }
            | Event::QuestionAsked { session_id } => {
                if self.policy.set_waiting(&session_id, true) {
                    self.refresh_title().await;
                }
            }
            Event::SessionStatus { session_id, busy } => {
                if busy && self.policy.set_waiting(&session_id, false) {
                    self.refresh_title().await;
                }
            }
            Event::SessionSelected { session_id } => {
                self.switch_to(&session_id, true).await;
            }
            Event::MessageUpdated { session_id } => {
                self.on_chat_message(&session_id).await;
            }
            Event::InstanceDisposed => {
                self.teardown().await;
            }
            Event::Unknown(kind) => {
                tracing::trace!(kind = %kind, "ignoring event");
            }
        }
    }

    /// Chat-message hook: activity on another session moves focus to it
    pub async fn on_chat_message(&mut self, session_id: &str) {
        self.switch_to(session_id, false).await;
    }

    /// Register a top-level session. Sub-agents are only remembered as such.
    fn track(&mut self, info: SessionRecord) -> bool {
        if info.is_subagent() {
            self.registry.remove(&info.id);
            self.registry.mark_subagent(&info.id);
            return false;
        }
        self.registry.upsert(info);
        true
    }

    async fn switch_to(&mut self, session_id: &str, selected: bool) {
        if session_id.is_empty() || self.policy.is_active(session_id) {
            return;
        }

        let name = match self
            .policy
            .resolve(session_id, &mut self.registry, self.lookup.as_ref())
            .await
        {
            Resolution::Name(name) => name,
            Resolution::Subagent => return,
        };

        if selected {
            self.policy.on_select(session_id);
        } else {
            self.policy.on_activity(session_id);
        }
        tracing::info!(session = session_id, selected, "focus moved");

        let title = render_title(&name, self.policy.is_waiting_for_input());
        self.driver.apply(&title).await;
    }

    async fn refresh_title(&mut self) {
        let Some(id) = self.policy.active_session_id().map(str::to_string) else {
            return;
        };

        match self
            .policy
            .resolve(&id, &mut self.registry, self.lookup.as_ref())
            .await
        {
            Resolution::Name(name) => {
                let title = render_title(&name, self.policy.is_waiting_for_input());
                self.driver.apply(&title).await;
            }
            Resolution::Subagent => {
                tracing::debug!(session = %id, "active session turned out to be a sub-agent");
            }
        }
    }

    async fn show_reset_title(&mut self) {
        let title = reset_title(&self.directory);
        self.driver.apply(&title).await;
    }

    /// Host is going away: forget everything and restore the directory title
    async fn teardown(&mut self) {
        self.policy.deactivate();
        self.policy.reset_lookups();
        self.registry.clear();
        self.show_reset_title().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::policy::tests::FakeLookup;
    use crate::tmux::title::tests::RecordingRenamer;

    const DIR: &str = "/home/dev/projects/app";

    fn app_with(lookup: FakeLookup) -> (App, RecordingRenamer) {
        let renamer = RecordingRenamer::default();
        let driver = WindowTitleDriver::with_enabled(Box::new(renamer.clone()), true);
        (App::new(driver, Box::new(lookup), DIR), renamer)
    }

    fn created(id: &str, title: Option<&str>) -> Event {
        Event::SessionCreated(SessionRecord::new(id, title))
    }

    fn status(id: &str, busy: bool) -> Event {
        Event::SessionStatus {
            session_id: id.to_string(),
            busy,
        }
    }

    fn idle(id: &str) -> Event {
        Event::SessionIdle {
            session_id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_created_session_stays_active() {
        let (mut app, renamer) = app_with(FakeLookup::default());

        app.handle_event(created("ses_aaaaaaaaaa", None)).await;
        app.handle_event(created("ses_bbbbbbbbbb", Some("Other"))).await;

        assert_eq!(app.policy.active_session_id(), Some("ses_aaaaaaaaaa"));
        assert!(app.registry.contains("ses_bbbbbbbbbb"));
        assert_eq!(renamer.calls(), vec!["● oc-ses_aaaa"]);
    }

    #[tokio::test]
    async fn test_session_lifecycle_titles() {
        let (mut app, renamer) = app_with(FakeLookup::default());

        app.handle_event(created("s1", Some("Fix bug"))).await;
        assert_eq!(app.current_title(), Some("● oc-Fix-bug"));

        app.handle_event(status("s1", true)).await;
        assert_eq!(app.current_title(), Some("oc-Fix-bug"));

        app.handle_event(idle("s1")).await;
        assert_eq!(app.current_title(), Some("● oc-Fix-bug"));

        app.handle_event(Event::SessionDeleted(SessionRecord::new("s1", None)))
            .await;
        assert_eq!(app.current_title(), Some("app"));
        assert_eq!(app.policy.active_session_id(), None);
        assert!(!app.policy.is_waiting_for_input());

        assert_eq!(
            renamer.calls(),
            vec!["● oc-Fix-bug", "oc-Fix-bug", "● oc-Fix-bug", "app"]
        );
    }

    #[tokio::test]
    async fn test_events_for_other_sessions_do_not_touch_waiting() {
        let (mut app, renamer) = app_with(FakeLookup::default());
        app.handle_event(created("s1", Some("One"))).await;
        app.handle_event(created("s2", Some("Two"))).await;

        app.handle_event(status("s2", true)).await;
        assert!(app.policy.is_waiting_for_input());

        app.handle_event(status("s1", true)).await;
        app.handle_event(idle("s2")).await;
        app.handle_event(Event::PermissionAsked {
            session_id: "s2".to_string(),
        })
        .await;
        assert!(!app.policy.is_waiting_for_input());

        app.handle_event(Event::SessionDeleted(SessionRecord::new("s2", None)))
            .await;
        assert_eq!(app.policy.active_session_id(), Some("s1"));
        assert_eq!(renamer.calls(), vec!["● oc-One", "oc-One"]);
    }

    #[tokio::test]
    async fn test_prompts_set_waiting() {
        let (mut app, _renamer) = app_with(FakeLookup::default());
        app.handle_event(created("s1", Some("One"))).await;
        app.handle_event(status("s1", true)).await;

        app.handle_event(Event::QuestionAsked {
            session_id: "s1".to_string(),
        })
        .await;
        assert_eq!(app.current_title(), Some("● oc-One"));

        app.handle_event(status("s1", true)).await;
        app.handle_event(Event::PermissionAsked {
            session_id: "s1".to_string(),
        })
        .await;
        assert_eq!(app.current_title(), Some("● oc-One"));
    }

    #[tokio::test]
    async fn test_non_busy_status_is_ignored() {
        let (mut app, _renamer) = app_with(FakeLookup::default());
        app.handle_event(created("s1", Some("One"))).await;
        app.handle_event(status("s1", true)).await;

        app.handle_event(status("s1", false)).await;

        assert!(!app.policy.is_waiting_for_input());
        assert_eq!(app.current_title(), Some("oc-One"));
    }

    #[tokio::test]
    async fn test_chat_message_switches_focus() {
        let (mut app, renamer) = app_with(FakeLookup::default());
        app.handle_event(created("s1", Some("One"))).await;
        app.handle_event(created("s2", Some("Two"))).await;
        assert_eq!(app.policy.active_session_id(), Some("s1"));

        app.handle_action(Action::ChatMessage {
            session_id: "s2".to_string(),
        })
        .await;

        assert_eq!(app.policy.active_session_id(), Some("s2"));
        assert_eq!(renamer.calls(), vec!["● oc-One", "● oc-Two"]);
    }

    #[tokio::test]
    async fn test_chat_message_on_active_session_is_noop() {
        let lookup = FakeLookup::default();
        let (mut app, renamer) = app_with(lookup.clone());
        app.handle_event(created("s1", Some("One"))).await;

        app.on_chat_message("s1").await;

        assert_eq!(renamer.calls(), vec!["● oc-One"]);
        assert!(lookup.requests().is_empty());
    }

    #[tokio::test]
    async fn test_chat_message_looks_up_unknown_session() {
        let lookup = FakeLookup::with(vec![SessionRecord::new("ses_remote", Some("Remote"))]);
        let (mut app, _renamer) = app_with(lookup.clone());

        app.on_chat_message("ses_remote").await;

        assert_eq!(app.current_title(), Some("● oc-Remote"));
        assert!(app.registry.contains("ses_remote"));
        assert_eq!(lookup.requests(), vec!["ses_remote"]);
    }

    #[tokio::test]
    async fn test_chat_message_lookup_failure_uses_short_id() {
        let lookup = FakeLookup {
            failing: true,
            ..FakeLookup::default()
        };
        let (mut app, _renamer) = app_with(lookup);

        app.on_chat_message("ses_0123456789").await;

        assert_eq!(app.policy.active_session_id(), Some("ses_0123456789"));
        assert_eq!(app.current_title(), Some("● oc-ses_0123"));
    }

    #[tokio::test]
    async fn test_subagent_sessions_never_activate() {
        let (mut app, renamer) = app_with(FakeLookup::default());
        let mut child = SessionRecord::new("ses_child", Some("Child"));
        child.parent_id = Some("s1".to_string());

        app.handle_event(Event::SessionCreated(child)).await;
        assert_eq!(app.policy.active_session_id(), None);
        assert!(!app.registry.contains("ses_child"));

        app.handle_event(created("s1", Some("One"))).await;
        app.on_chat_message("ses_child").await;

        assert_eq!(app.policy.active_session_id(), Some("s1"));
        assert_eq!(renamer.calls(), vec!["● oc-One"]);
    }

    #[tokio::test]
    async fn test_active_session_turning_subagent_is_released() {
        let (mut app, renamer) = app_with(FakeLookup::default());
        app.handle_event(created("s1", Some("One"))).await;

        let mut child = SessionRecord::new("s1", Some("One"));
        child.parent_id = Some("p".to_string());
        app.handle_event(Event::SessionUpdated(child)).await;

        assert_eq!(app.policy.active_session_id(), None);
        assert!(!app.registry.contains("s1"));
        assert!(app.registry.is_subagent("s1"));

        app.handle_event(status("s1", true)).await;
        app.handle_event(created("s2", Some("Two"))).await;

        assert_eq!(app.policy.active_session_id(), Some("s2"));
        assert_eq!(renamer.calls(), vec!["● oc-One", "app", "oc-Two"]);
    }

    #[tokio::test]
    async fn test_session_updated_renames_active_only() {
        let (mut app, renamer) = app_with(FakeLookup::default());
        app.handle_event(created("s1", None)).await;
        app.handle_event(created("s2", None)).await;

        app.handle_event(Event::SessionUpdated(SessionRecord::new("s2", Some("Two"))))
            .await;
        app.handle_event(Event::SessionUpdated(SessionRecord::new("s1", Some("Renamed"))))
            .await;

        assert_eq!(renamer.calls(), vec!["● oc-s1", "● oc-Renamed"]);
        assert_eq!(app.registry.get("s2").and_then(|r| r.title.as_deref()), Some("Two"));
    }

    #[tokio::test]
    async fn test_select_switches_and_sets_waiting() {
        let (mut app, _renamer) = app_with(FakeLookup::default());
        app.handle_event(created("s1", Some("One"))).await;
        app.handle_event(created("s2", Some("Two"))).await;
        app.handle_event(status("s1", true)).await;

        app.handle_event(Event::SessionSelected {
            session_id: "s2".to_string(),
        })
        .await;

        assert_eq!(app.policy.active_session_id(), Some("s2"));
        assert!(app.policy.is_waiting_for_input());
        assert_eq!(app.current_title(), Some("● oc-Two"));
    }

    #[tokio::test]
    async fn test_disposed_resets_everything() {
        let (mut app, _renamer) = app_with(FakeLookup::default());
        app.handle_event(created("s1", Some("One"))).await;

        app.handle_event(Event::InstanceDisposed).await;

        assert_eq!(app.policy.active_session_id(), None);
        assert!(!app.policy.is_waiting_for_input());
        assert!(app.registry.is_empty());
        assert_eq!(app.current_title(), Some("app"));

        app.handle_event(created("s2", Some("Two"))).await;
        assert_eq!(app.policy.active_session_id(), Some("s2"));
        assert_eq!(app.current_title(), Some("oc-Two"));
    }

    #[tokio::test]
    async fn test_shutdown_action_quits() {
        let (mut app, _renamer) = app_with(FakeLookup::default());
        app.start().await;
        assert_eq!(app.current_title(), Some("● oc-app"));

        let quit = app.handle_action(Action::Shutdown).await;

        assert!(quit);
        assert_eq!(app.current_title(), Some("app"));
    }

    #[tokio::test]
    async fn test_unknown_event_is_ignored() {
        let (mut app, renamer) = app_with(FakeLookup::default());

        let quit = app
            .handle_action(Action::Event(Event::Unknown("lsp.updated".to_string())))
            .await;

        assert!(!quit);
        assert!(renamer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_rename_does_not_affect_tracking() {
        let (mut app, renamer) = app_with(FakeLookup::default());
        renamer
            .failing
            .store(true, std::sync::atomic::Ordering::SeqCst);

        app.handle_event(created("s1", Some("One"))).await;

        assert_eq!(app.policy.active_session_id(), Some("s1"));
        assert_eq!(app.current_title(), None);
    }
}
