//! Session and running-tool types tracked by the registry
//!
//! A session is one agent conversation (Claude Code or Codex), keyed by the
//! opaque `session_id` its source supplies. The registry owns the only mutable
//! copies; the HUD works from cloned snapshots.

use crate::config::RECENT_TOOLS_MAX;
use crate::event::AgentKind;
use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::time::Instant;

/// Lifecycle state of a tracked session
///
/// `Running` is the only state that blocks the stale timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The agent is actively processing
    Running,
    /// The agent finished its turn and waits for a new prompt
    Idle,
    /// Blocked on a human permission decision
    Attention,
    /// Explicitly waiting for user text input
    Waiting,
    /// Compacting its context window
    Compacting,
    /// No events for the stale timeout while non-running
    Stale,
}

/// A tool invocation currently in flight inside a session
#[derive(Debug, Clone, PartialEq)]
pub struct RunningTool {
    /// Unique per (session, in-flight tool); dedup key on insert
    pub tool_id: String,
    pub tool_name: String,
    pub tool_label: Option<String>,
}

/// One tracked agent session
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub agent_kind: AgentKind,
    /// Best-effort working directory; may be empty for Codex until discovered
    pub cwd: String,
    /// User- or skill-supplied display name
    pub name: Option<String>,
    pub state: SessionState,
    /// Insertion-ordered; `tool_id` is unique within the sequence
    pub running_tools: Vec<RunningTool>,
    /// Set on entering Idle, cleared on leaving
    pub stopped_at: Option<DateTime<Local>>,
    /// Set on entering Stale, cleared on leaving
    pub stale_at: Option<DateTime<Local>>,
    /// Tool name that triggered Attention; cleared on any exit from Attention
    pub permission_tool: Option<String>,
    /// Monotonic timestamp of the last event that touched this session
    pub last_event_at: Instant,
    /// Last few completed tool labels, consecutive duplicates collapsed
    pub recent_tools: VecDeque<String>,
    /// Registration order, for a stable session-list ordering
    pub(crate) seq: u64,
}

impl Session {
    pub(crate) fn new(session_id: String, agent_kind: AgentKind, cwd: String, seq: u64) -> Self {
        Self {
            session_id,
            agent_kind,
            cwd,
            name: None,
            state: SessionState::Running,
            running_tools: Vec::new(),
            stopped_at: None,
            stale_at: None,
            permission_tool: None,
            last_event_at: Instant::now(),
            recent_tools: VecDeque::with_capacity(RECENT_TOOLS_MAX),
            seq,
        }
    }

    /// Transition to `next`, maintaining the timestamps and attention fields
    /// that are defined as set-on-enter / clear-on-exit.
    pub(crate) fn set_state(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        match self.state {
            SessionState::Idle => self.stopped_at = None,
            SessionState::Stale => self.stale_at = None,
            SessionState::Attention => self.permission_tool = None,
            _ => {}
        }
        match next {
            SessionState::Idle => self.stopped_at = Some(Local::now()),
            SessionState::Stale => self.stale_at = Some(Local::now()),
            _ => {}
        }
        self.state = next;
    }

    /// Insert a tool, deduplicating by `tool_id`; order is insertion order
    pub(crate) fn add_tool(&mut self, tool: RunningTool) {
        if self.running_tools.iter().any(|t| t.tool_id == tool.tool_id) {
            return;
        }
        self.running_tools.push(tool);
    }

    /// Remove a tool by id; unknown ids are a no-op. Returns the removed tool.
    pub(crate) fn remove_tool(&mut self, tool_id: &str) -> Option<RunningTool> {
        let idx = self.running_tools.iter().position(|t| t.tool_id == tool_id)?;
        Some(self.running_tools.remove(idx))
    }

    /// Push a completed tool's display label onto the recent-activity ring
    pub(crate) fn push_recent(&mut self, label: String) {
        if self.recent_tools.back() == Some(&label) {
            return;
        }
        if self.recent_tools.len() >= RECENT_TOOLS_MAX {
            self.recent_tools.pop_front();
        }
        self.recent_tools.push_back(label);
    }
}
