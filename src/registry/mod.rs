//! The session registry: authoritative state machine over sessions
//!
//! All mutation flows through [`Registry::apply`] and [`Registry::remove`],
//! which serialize on one lock. The HUD frame loop reads via
//! [`Registry::snapshot`]. The registry also owns the per-session stale
//! timers: every handled event cancels the pending timer and re-arms it
//! unless the session is Running (running sessions cannot go stale) or
//! already Stale (stale sessions stay until an event or removal).

mod session;

pub use session::{RunningTool, Session, SessionState};

use crate::config::STALE_TIMEOUT;
use crate::event::{AgentEvent, EventPayload};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

struct Entry {
    session: Session,
    /// Abort handle for the pending stale timer, if armed
    timer: Option<tokio::task::JoinHandle<()>>,
    /// Bumped on every handled event; a firing timer with an older
    /// generation is a no-op
    timer_gen: u64,
}

impl Entry {
    fn cancel_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }
}

struct Shared {
    sessions: RwLock<HashMap<String, Entry>>,
    stale_timeout: Duration,
    next_seq: AtomicU64,
}

/// Handle to the shared registry; clones are cheap and refer to the same state
#[derive(Clone)]
pub struct Registry {
    shared: Arc<Shared>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Empty registry with the design stale timeout (10 minutes)
    pub fn new() -> Self {
        Self::with_stale_timeout(STALE_TIMEOUT)
    }

    /// Empty registry with a custom stale timeout; tests use short ones
    pub fn with_stale_timeout(stale_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                sessions: RwLock::new(HashMap::new()),
                stale_timeout,
                next_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Apply one event. Events for unknown sessions are no-ops unless they
    /// are `SessionStarted`; creation is adapter-driven.
    pub fn apply(&self, event: AgentEvent) {
        let AgentEvent {
            session_id,
            agent_kind,
            payload,
        } = event;

        let mut sessions = self.shared.sessions.write().expect("registry lock poisoned");

        if let EventPayload::SessionEnded = payload {
            if let Some(mut entry) = sessions.remove(&session_id) {
                entry.cancel_timer();
                tracing::info!(session_id = %session_id, "Session ended");
            }
            return;
        }

        if !sessions.contains_key(&session_id) {
            let EventPayload::SessionStarted { ref cwd, .. } = payload else {
                tracing::debug!(session_id = %session_id, ?payload, "Event for unknown session, dropping");
                return;
            };
            let seq = self.shared.next_seq.fetch_add(1, Ordering::Relaxed);
            sessions.insert(
                session_id.clone(),
                Entry {
                    session: Session::new(session_id.clone(), agent_kind, cwd.clone(), seq),
                    timer: None,
                    timer_gen: 0,
                },
            );
            tracing::info!(session_id = %session_id, ?agent_kind, "Session registered");
        }

        let entry = sessions.get_mut(&session_id).expect("entry just ensured");
        let session = &mut entry.session;

        match payload {
            EventPayload::SessionStarted { cwd, name } => {
                if !cwd.is_empty() {
                    session.cwd = cwd;
                }
                if name.is_some() {
                    session.name = name;
                }
                session.running_tools.clear();
                session.set_state(SessionState::Running);
            }
            EventPayload::ToolStarted {
                tool_id,
                tool_name,
                tool_label,
            } => {
                session.add_tool(RunningTool {
                    tool_id,
                    tool_name,
                    tool_label,
                });
                session.set_state(SessionState::Running);
            }
            EventPayload::ToolCompleted { tool_id } => {
                if let Some(tool) = session.remove_tool(&tool_id) {
                    let label = tool.tool_label.unwrap_or(tool.tool_name);
                    if !label.is_empty() {
                        session.push_recent(label);
                    }
                }
            }
            EventPayload::Activity => session.set_state(SessionState::Running),
            EventPayload::Idle => {
                session.running_tools.clear();
                session.set_state(SessionState::Idle);
            }
            EventPayload::NeedsAttention { message } => {
                session.set_state(SessionState::Attention);
                session.permission_tool = message;
            }
            EventPayload::WaitingForInput => session.set_state(SessionState::Waiting),
            EventPayload::Compacting => session.set_state(SessionState::Compacting),
            EventPayload::SessionNameUpdated { name } => session.name = Some(name),
            EventPayload::SessionEnded => unreachable!("handled above"),
        }

        session.last_event_at = Instant::now();
        self.rearm_timer(entry, &session_id);
    }

    /// User-initiated removal (the session list's bomb affordance)
    pub fn remove(&self, session_id: &str) {
        let mut sessions = self.shared.sessions.write().expect("registry lock poisoned");
        if let Some(mut entry) = sessions.remove(session_id) {
            entry.cancel_timer();
            tracing::info!(session_id = %session_id, "Session removed by user");
        }
    }

    /// Clone of every tracked session, in registration order
    pub fn snapshot(&self) -> Vec<Session> {
        let sessions = self.shared.sessions.read().expect("registry lock poisoned");
        let mut out: Vec<Session> = sessions.values().map(|e| e.session.clone()).collect();
        out.sort_by_key(|s| s.seq);
        out
    }

    pub fn len(&self) -> usize {
        self.shared.sessions.read().expect("registry lock poisoned").len()
    }

    #[allow(dead_code)] // Used in tests
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancel any pending timer and arm a fresh one unless the session is
    /// Running or already Stale. Must be called with the write lock held
    /// through `entry`.
    fn rearm_timer(&self, entry: &mut Entry, session_id: &str) {
        entry.cancel_timer();
        entry.timer_gen += 1;

        if matches!(
            entry.session.state,
            SessionState::Running | SessionState::Stale
        ) {
            return;
        }

        // Outside a runtime (pure state-machine tests) staleness is driven
        // explicitly; the daemon always runs timers on the background runtime.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let shared = Arc::clone(&self.shared);
        let generation = entry.timer_gen;
        let id = session_id.to_string();
        let timeout = self.shared.stale_timeout;
        let armed_at = Instant::now();
        entry.timer = Some(handle.spawn(async move {
            tokio::time::sleep(timeout).await;
            fire_stale(&shared, &id, generation, armed_at);
        }));
    }

    #[cfg(test)]
    fn session(&self, session_id: &str) -> Option<Session> {
        self.shared
            .sessions
            .read()
            .unwrap()
            .get(session_id)
            .map(|e| e.session.clone())
    }
}

/// Timer expiry: transition to Stale only if no event superseded the arming
fn fire_stale(shared: &Arc<Shared>, session_id: &str, generation: u64, armed_at: Instant) {
    let mut sessions = shared.sessions.write().expect("registry lock poisoned");
    let Some(entry) = sessions.get_mut(session_id) else {
        return;
    };
    if entry.timer_gen != generation || entry.session.last_event_at > armed_at {
        return;
    }
    entry.timer = None;
    entry.session.set_state(SessionState::Stale);
    tracing::debug!(session_id = %session_id, "Session went stale");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{AgentKind, EventPayload};

    fn ev(session_id: &str, payload: EventPayload) -> AgentEvent {
        AgentEvent::new(session_id, AgentKind::ClaudeCode, payload)
    }

    fn started(session_id: &str, cwd: &str) -> AgentEvent {
        ev(
            session_id,
            EventPayload::SessionStarted {
                cwd: cwd.to_string(),
                name: None,
            },
        )
    }

    fn tool(session_id: &str, tool_id: &str, name: &str, label: &str) -> AgentEvent {
        ev(
            session_id,
            EventPayload::ToolStarted {
                tool_id: tool_id.to_string(),
                tool_name: name.to_string(),
                tool_label: Some(label.to_string()),
            },
        )
    }

    #[test]
    fn test_registry_starts_empty() {
        assert!(Registry::new().is_empty());
    }

    #[test]
    fn test_session_started_creates_running_session() {
        let registry = Registry::new();
        registry.apply(started("s1", "/u/dev/app"));

        let s = registry.session("s1").unwrap();
        assert_eq!(s.state, SessionState::Running);
        assert_eq!(s.cwd, "/u/dev/app");
        assert!(s.running_tools.is_empty());
        assert!(s.name.is_none());
    }

    #[test]
    fn test_events_for_unknown_session_are_noops() {
        let registry = Registry::new();
        registry.apply(ev("ghost", EventPayload::Activity));
        registry.apply(ev(
            "ghost",
            EventPayload::ToolCompleted {
                tool_id: "t1".to_string(),
            },
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_tool_lifecycle() {
        let registry = Registry::new();
        registry.apply(started("s1", "/u/dev/app"));
        registry.apply(tool("s1", "t1", "Read", "main.rs"));
        registry.apply(tool("s1", "t2", "Bash", "npm test"));
        registry.apply(ev(
            "s1",
            EventPayload::ToolCompleted {
                tool_id: "t1".to_string(),
            },
        ));

        let s = registry.session("s1").unwrap();
        assert_eq!(s.state, SessionState::Running);
        assert_eq!(s.running_tools.len(), 1);
        assert_eq!(s.running_tools[0].tool_id, "t2");
        assert_eq!(s.running_tools[0].tool_name, "Bash");
        assert_eq!(s.recent_tools.front().map(String::as_str), Some("main.rs"));
    }

    #[test]
    fn test_tool_completed_is_idempotent() {
        let registry = Registry::new();
        registry.apply(started("s1", "/p"));
        registry.apply(tool("s1", "t1", "Read", "a.rs"));
        for _ in 0..3 {
            registry.apply(ev(
                "s1",
                EventPayload::ToolCompleted {
                    tool_id: "t1".to_string(),
                },
            ));
        }
        let s = registry.session("s1").unwrap();
        assert!(s.running_tools.is_empty());
        assert_eq!(s.recent_tools.len(), 1);
    }

    #[test]
    fn test_attention_then_activity_then_idle() {
        let registry = Registry::new();
        registry.apply(started("s1", "/p"));
        registry.apply(ev(
            "s1",
            EventPayload::NeedsAttention {
                message: Some("Bash".to_string()),
            },
        ));

        let s = registry.session("s1").unwrap();
        assert_eq!(s.state, SessionState::Attention);
        assert_eq!(s.permission_tool.as_deref(), Some("Bash"));

        registry.apply(ev("s1", EventPayload::Activity));
        let s = registry.session("s1").unwrap();
        assert_eq!(s.state, SessionState::Running);
        assert!(s.permission_tool.is_none(), "cleared on leaving Attention");

        registry.apply(ev("s1", EventPayload::Idle));
        let s = registry.session("s1").unwrap();
        assert_eq!(s.state, SessionState::Idle);
        assert!(s.running_tools.is_empty());
        assert!(s.stopped_at.is_some());
    }

    #[test]
    fn test_idle_clears_running_tools() {
        let registry = Registry::new();
        registry.apply(started("s1", "/p"));
        registry.apply(tool("s1", "t1", "Bash", "sleep 99"));
        registry.apply(tool("s1", "t2", "Read", "x.rs"));
        registry.apply(ev("s1", EventPayload::Idle));
        assert!(registry.session("s1").unwrap().running_tools.is_empty());
    }

    #[test]
    fn test_tool_started_wakes_idle_session() {
        let registry = Registry::new();
        registry.apply(started("s1", "/p"));
        registry.apply(ev("s1", EventPayload::Idle));
        registry.apply(tool("s1", "t1", "Grep", "todo"));

        let s = registry.session("s1").unwrap();
        assert_eq!(s.state, SessionState::Running);
        assert!(s.stopped_at.is_none());
        assert_eq!(s.running_tools.len(), 1);
    }

    #[test]
    fn test_needs_attention_updates_tool_in_place() {
        let registry = Registry::new();
        registry.apply(started("s1", "/p"));
        registry.apply(ev(
            "s1",
            EventPayload::NeedsAttention {
                message: Some("Bash".to_string()),
            },
        ));
        registry.apply(ev(
            "s1",
            EventPayload::NeedsAttention {
                message: Some("WebFetch".to_string()),
            },
        ));
        let s = registry.session("s1").unwrap();
        assert_eq!(s.state, SessionState::Attention);
        assert_eq!(s.permission_tool.as_deref(), Some("WebFetch"));
    }

    #[test]
    fn test_session_ended_removes_and_subsequent_events_are_noops() {
        let registry = Registry::new();
        registry.apply(started("s1", "/p"));
        registry.apply(ev("s1", EventPayload::SessionEnded));
        assert!(registry.is_empty());

        registry.apply(ev("s1", EventPayload::Activity));
        assert!(registry.is_empty());

        registry.apply(started("s1", "/p"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_name_update_preserves_state() {
        let registry = Registry::new();
        registry.apply(started("s1", "/p"));
        registry.apply(ev("s1", EventPayload::Idle));
        registry.apply(ev(
            "s1",
            EventPayload::SessionNameUpdated {
                name: "Fix Login".to_string(),
            },
        ));
        let s = registry.session("s1").unwrap();
        assert_eq!(s.name.as_deref(), Some("Fix Login"));
        assert_eq!(s.state, SessionState::Idle);
        assert!(s.stopped_at.is_some(), "no state churn from a name update");
    }

    #[test]
    fn test_session_restarted_resets_tools() {
        let registry = Registry::new();
        registry.apply(started("s1", "/p"));
        registry.apply(tool("s1", "t1", "Bash", "make"));
        registry.apply(started("s1", "/p"));
        let s = registry.session("s1").unwrap();
        assert!(s.running_tools.is_empty());
        assert_eq!(s.state, SessionState::Running);
    }

    #[test]
    fn test_snapshot_is_registration_ordered() {
        let registry = Registry::new();
        for id in ["c", "a", "b"] {
            registry.apply(started(id, "/p"));
        }
        let ids: Vec<String> = registry.snapshot().into_iter().map(|s| s.session_id).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_non_running_session_goes_stale_exactly_once() {
        let registry = Registry::with_stale_timeout(Duration::from_millis(30));
        registry.apply(started("s1", "/p"));
        registry.apply(ev("s1", EventPayload::Idle));

        tokio::time::sleep(Duration::from_millis(120)).await;
        let s = registry.session("s1").unwrap();
        assert_eq!(s.state, SessionState::Stale);
        let first_stale_at = s.stale_at.expect("stale_at set on entering Stale");

        // More quiet time must not re-fire
        tokio::time::sleep(Duration::from_millis(120)).await;
        let s = registry.session("s1").unwrap();
        assert_eq!(s.state, SessionState::Stale);
        assert_eq!(s.stale_at, Some(first_stale_at));
        assert_eq!(registry.len(), 1, "stale sessions are never auto-removed");
    }

    #[tokio::test]
    async fn test_running_session_never_goes_stale() {
        let registry = Registry::with_stale_timeout(Duration::from_millis(30));
        registry.apply(started("s1", "/p"));

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(registry.session("s1").unwrap().state, SessionState::Running);
    }

    #[tokio::test]
    async fn test_event_supersedes_pending_timer() {
        let registry = Registry::with_stale_timeout(Duration::from_millis(60));
        registry.apply(started("s1", "/p"));
        registry.apply(ev("s1", EventPayload::Idle));

        tokio::time::sleep(Duration::from_millis(30)).await;
        registry.apply(tool("s1", "t1", "Bash", "make"));

        tokio::time::sleep(Duration::from_millis(60)).await;
        let s = registry.session("s1").unwrap();
        assert_eq!(s.state, SessionState::Running, "running blocks staleness");
    }

    #[tokio::test]
    async fn test_stale_session_wakes_on_event() {
        let registry = Registry::with_stale_timeout(Duration::from_millis(30));
        registry.apply(started("s1", "/p"));
        registry.apply(ev("s1", EventPayload::WaitingForInput));

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(registry.session("s1").unwrap().state, SessionState::Stale);

        registry.apply(ev("s1", EventPayload::Activity));
        let s = registry.session("s1").unwrap();
        assert_eq!(s.state, SessionState::Running);
        assert!(s.stale_at.is_none());
    }

    #[test]
    fn test_user_removal_is_state_independent() {
        let registry = Registry::new();
        registry.apply(started("s1", "/p"));
        registry.apply(tool("s1", "t1", "Bash", "make"));
        registry.remove("s1");
        assert!(registry.is_empty());

        // Removing an unknown session is harmless
        registry.remove("s1");
    }
}
