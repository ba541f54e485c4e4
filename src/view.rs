//! Pure projections from registry snapshots to HUD-ready values
//!
//! Nothing here mutates or subscribes; the frame loop takes a snapshot and
//! asks these functions what the indicator and the session list must show.

use crate::config::{PLACEHOLDERS, TOOL_CYCLE_MS};
use crate::event::AgentKind;
use crate::registry::{RunningTool, Session, SessionState};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Aggregate state for the small always-visible indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorState {
    Idle,
    Attention,
    Waiting,
    Running,
}

/// Richer 5-value projection for the notch-flanking indicator variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotchState {
    NoSessions,
    Running,
    Compacting,
    Idle,
    Stale,
}

/// What one session-list row must display
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRow {
    pub session_id: String,
    pub title: String,
    pub subtitle: String,
    pub state: SessionState,
    pub agent_kind: AgentKind,
}

/// Short badge for the row's agent kind
pub fn agent_badge(kind: AgentKind) -> &'static str {
    match kind {
        AgentKind::ClaudeCode => "claude",
        AgentKind::Codex => "codex",
    }
}

/// Aggregate indicator priority: attention > waiting > running; no sessions
/// reads as idle. Order-independent over the snapshot.
pub fn aggregate_indicator(sessions: &[Session]) -> IndicatorState {
    if sessions.is_empty() {
        return IndicatorState::Idle;
    }
    if sessions.iter().any(|s| s.state == SessionState::Attention) {
        return IndicatorState::Attention;
    }
    if sessions.iter().any(|s| s.state == SessionState::Waiting) {
        return IndicatorState::Waiting;
    }
    IndicatorState::Running
}

/// Notch variant priority: running > compacting > idle > stale
pub fn notch_state(sessions: &[Session]) -> NotchState {
    if sessions.is_empty() {
        return NotchState::NoSessions;
    }
    if sessions.iter().any(|s| s.state == SessionState::Running) {
        return NotchState::Running;
    }
    if sessions.iter().any(|s| s.state == SessionState::Compacting) {
        return NotchState::Compacting;
    }
    if sessions
        .iter()
        .any(|s| !matches!(s.state, SessionState::Stale))
    {
        return NotchState::Idle;
    }
    NotchState::Stale
}

/// Project one session onto its list row at wall-clock `now_ms`
pub fn session_row(session: &Session, now_ms: u64) -> SessionRow {
    SessionRow {
        session_id: session.session_id.clone(),
        title: title(session),
        subtitle: subtitle(session, now_ms),
        state: session.state,
        agent_kind: session.agent_kind,
    }
}

/// Display title: name, else last path segment of cwd, else "Unknown"
pub fn title(session: &Session) -> String {
    if let Some(name) = &session.name {
        if !name.is_empty() {
            return name.clone();
        }
    }
    basename(&session.cwd)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "Unknown".to_string())
}

fn subtitle(session: &Session, now_ms: u64) -> String {
    match session.state {
        SessionState::Idle => match session.stopped_at {
            Some(at) => format!("waiting since {}", at.format("%H:%M")),
            None => "waiting".to_string(),
        },
        SessionState::Stale => match session.stale_at {
            Some(at) => format!("inactive since {}", at.format("%H:%M")),
            None => "inactive".to_string(),
        },
        SessionState::Attention => format!(
            "{} needs permission",
            session.permission_tool.as_deref().unwrap_or("Tool")
        ),
        SessionState::Waiting => "waiting for input".to_string(),
        SessionState::Compacting => "compacting context…".to_string(),
        SessionState::Running => {
            if !session.running_tools.is_empty() {
                let idx = tool_index(now_ms, session.running_tools.len());
                tool_display(&session.running_tools[idx])
            } else if !session.recent_tools.is_empty() {
                let idx = tool_index(now_ms, session.recent_tools.len());
                session.recent_tools[idx].clone()
            } else {
                placeholder(&session.session_id).to_string()
            }
        }
    }
}

/// Which running tool to show at wall-clock `now_ms`. Cycles at a fixed
/// period and clamps when the list contracts underneath it.
pub fn tool_index(now_ms: u64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    ((now_ms / TOOL_CYCLE_MS) as usize) % len
}

/// Subtitle placeholder for a running session with nothing in flight,
/// stable per session_id for the lifetime of the process.
pub fn placeholder(session_id: &str) -> &'static str {
    let mut hasher = DefaultHasher::new();
    session_id.hash(&mut hasher);
    PLACEHOLDERS[(hasher.finish() % PLACEHOLDERS.len() as u64) as usize]
}

/// Display string for a running tool. MCP tools (`mcp__server__function`)
/// render as `"server: label"`, falling back to the function name.
pub fn tool_display(tool: &RunningTool) -> String {
    if let Some((server, function)) = split_mcp_name(&tool.tool_name) {
        let label = tool
            .tool_label
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(function);
        return format!("{server}: {label}");
    }
    tool.tool_label
        .clone()
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| tool.tool_name.clone())
}

/// Split `mcp__server__function` into (server, function)
fn split_mcp_name(tool_name: &str) -> Option<(&str, &str)> {
    let rest = tool_name.strip_prefix("mcp__")?;
    let (server, function) = rest.split_once("__")?;
    if server.is_empty() || function.is_empty() {
        return None;
    }
    Some((server, function))
}

fn basename(path: &str) -> Option<&str> {
    path.trim_end_matches('/').rsplit('/').next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::AgentKind;

    fn session(id: &str, state: SessionState) -> Session {
        let mut s = Session::new(id.to_string(), AgentKind::ClaudeCode, "/u/dev/app".to_string(), 0);
        s.set_state(state);
        s
    }

    fn running_tool(id: &str, name: &str, label: Option<&str>) -> RunningTool {
        RunningTool {
            tool_id: id.to_string(),
            tool_name: name.to_string(),
            tool_label: label.map(str::to_string),
        }
    }

    #[test]
    fn test_aggregate_empty_is_idle() {
        assert_eq!(aggregate_indicator(&[]), IndicatorState::Idle);
    }

    #[test]
    fn test_aggregate_priority_is_order_independent() {
        let mut sessions = vec![
            session("a", SessionState::Running),
            session("b", SessionState::Waiting),
            session("c", SessionState::Attention),
        ];
        assert_eq!(aggregate_indicator(&sessions), IndicatorState::Attention);
        sessions.reverse();
        assert_eq!(aggregate_indicator(&sessions), IndicatorState::Attention);

        let sessions = vec![
            session("a", SessionState::Idle),
            session("b", SessionState::Waiting),
        ];
        assert_eq!(aggregate_indicator(&sessions), IndicatorState::Waiting);

        let sessions = vec![session("a", SessionState::Idle)];
        assert_eq!(aggregate_indicator(&sessions), IndicatorState::Running);
    }

    #[test]
    fn test_notch_priority() {
        assert_eq!(notch_state(&[]), NotchState::NoSessions);

        let sessions = vec![
            session("a", SessionState::Stale),
            session("b", SessionState::Compacting),
            session("c", SessionState::Running),
        ];
        assert_eq!(notch_state(&sessions), NotchState::Running);

        let sessions = vec![
            session("a", SessionState::Stale),
            session("b", SessionState::Compacting),
        ];
        assert_eq!(notch_state(&sessions), NotchState::Compacting);

        let sessions = vec![
            session("a", SessionState::Stale),
            session("b", SessionState::Idle),
        ];
        assert_eq!(notch_state(&sessions), NotchState::Idle);

        let sessions = vec![session("a", SessionState::Stale)];
        assert_eq!(notch_state(&sessions), NotchState::Stale);
    }

    #[test]
    fn test_title_fallbacks() {
        let mut s = session("s1", SessionState::Running);
        assert_eq!(title(&s), "app");

        s.name = Some("Fix Login".to_string());
        assert_eq!(title(&s), "Fix Login");

        s.name = None;
        s.cwd = String::new();
        assert_eq!(title(&s), "Unknown");
    }

    #[test]
    fn test_subtitle_per_state() {
        let mut s = session("s1", SessionState::Attention);
        s.permission_tool = Some("Bash".to_string());
        assert_eq!(session_row(&s, 0).subtitle, "Bash needs permission");

        s.permission_tool = None;
        assert_eq!(session_row(&s, 0).subtitle, "Tool needs permission");

        let s = session("s1", SessionState::Waiting);
        assert_eq!(session_row(&s, 0).subtitle, "waiting for input");

        let s = session("s1", SessionState::Compacting);
        assert_eq!(session_row(&s, 0).subtitle, "compacting context…");

        let s = session("s1", SessionState::Idle);
        assert!(session_row(&s, 0).subtitle.starts_with("waiting since "));

        let s = session("s1", SessionState::Stale);
        assert!(session_row(&s, 0).subtitle.starts_with("inactive since "));
    }

    #[test]
    fn test_placeholder_is_stable_per_session() {
        let first = placeholder("s1");
        for _ in 0..10 {
            assert_eq!(placeholder("s1"), first);
        }
        assert!(PLACEHOLDERS.contains(&first));
    }

    #[test]
    fn test_running_without_tools_shows_placeholder() {
        let s = session("s1", SessionState::Running);
        assert_eq!(session_row(&s, 0).subtitle, placeholder("s1"));
    }

    #[test]
    fn test_running_rotates_recent_activity_when_no_tools() {
        let mut s = session("s1", SessionState::Running);
        s.recent_tools.push_back("main.rs".to_string());
        s.recent_tools.push_back("npm test".to_string());
        assert_eq!(session_row(&s, 0).subtitle, "main.rs");
        assert_eq!(session_row(&s, TOOL_CYCLE_MS).subtitle, "npm test");
        assert_eq!(session_row(&s, 2 * TOOL_CYCLE_MS).subtitle, "main.rs");
    }

    #[test]
    fn test_tool_cycling_and_clamp() {
        assert_eq!(tool_index(0, 3), 0);
        assert_eq!(tool_index(TOOL_CYCLE_MS, 3), 1);
        assert_eq!(tool_index(2 * TOOL_CYCLE_MS, 3), 2);
        assert_eq!(tool_index(3 * TOOL_CYCLE_MS, 3), 0);
        // List contracted under the cursor: index stays in bounds
        assert_eq!(tool_index(2 * TOOL_CYCLE_MS, 1), 0);
        assert_eq!(tool_index(u64::MAX / 2, 1), 0);
    }

    #[test]
    fn test_mcp_tool_display() {
        let tool = running_tool(
            "m1",
            "mcp__github__search_repositories",
            Some("react hooks"),
        );
        assert_eq!(tool_display(&tool), "github: react hooks");

        let tool = running_tool("m1", "mcp__github__search_repositories", None);
        assert_eq!(tool_display(&tool), "github: search_repositories");
    }

    #[test]
    fn test_plain_tool_display_prefers_label() {
        let tool = running_tool("t1", "Bash", Some("npm test"));
        assert_eq!(tool_display(&tool), "npm test");

        let tool = running_tool("t1", "Bash", None);
        assert_eq!(tool_display(&tool), "Bash");
    }

    #[test]
    fn test_running_subtitle_cycles_tools() {
        let mut s = session("s1", SessionState::Running);
        s.running_tools.push(running_tool("t1", "Read", Some("main.rs")));
        s.running_tools.push(running_tool("t2", "Bash", Some("npm test")));
        assert_eq!(session_row(&s, 0).subtitle, "main.rs");
        assert_eq!(session_row(&s, TOOL_CYCLE_MS).subtitle, "npm test");
    }
}
