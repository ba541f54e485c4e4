//! Tunable constants and persisted HUD configuration
//!
//! Two sibling JSON files live under the per-user data directory:
//! `config.json` (theme) and `state.json` (overlay surface positions).
//! Neither holds session state; the registry always starts empty.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Inactivity timeout after which a non-running session goes Stale
pub const STALE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Period of the running-tool subtitle rotation
pub const TOOL_CYCLE_MS: u64 = 2000;

/// Bound on the per-session recent-activity ring
pub const RECENT_TOOLS_MAX: usize = 6;

/// Rollout files modified within this window are bootstrapped on startup
pub const BOOTSTRAP_WINDOW: Duration = Duration::from_secs(10 * 60);

/// At most this many tail records are replayed per bootstrapped rollout file
pub const BOOTSTRAP_REPLAY_MAX: usize = 4;

/// Fallback rescan period for dropped filesystem notifications
pub const RESCAN_INTERVAL: Duration = Duration::from_secs(5);

/// Subtitle placeholders for a running session with no tools in flight.
/// One is picked per session_id and stays stable for the process lifetime.
pub const PLACEHOLDERS: [&str; 8] = [
    "thinking…",
    "drafting…",
    "building…",
    "planning…",
    "analyzing…",
    "pondering…",
    "processing…",
    "reasoning…",
];

/// Color theme for the HUD surfaces
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
    #[default]
    System,
}

impl Theme {
    pub fn palette(self) -> &'static colors::Palette {
        match self {
            Theme::Light => &colors::LIGHT,
            // No OS appearance probe; System reads as the dark palette
            Theme::Dark | Theme::System => &colors::DARK,
        }
    }
}

/// State color palettes for the HUD surfaces
pub mod colors {
    use ratatui::style::Color;

    pub struct Palette {
        pub fg: Color,
        pub dim: Color,
        pub running: Color,
        pub attention: Color,
        pub waiting: Color,
        pub compacting: Color,
        pub idle: Color,
        pub stale: Color,
        pub border: Color,
        pub highlight: Color,
    }

    pub const DARK: Palette = Palette {
        fg: Color::Rgb(192, 202, 245),
        dim: Color::Rgb(86, 95, 137),
        running: Color::Rgb(122, 162, 247),
        attention: Color::Rgb(255, 158, 100),
        waiting: Color::Rgb(224, 175, 104),
        compacting: Color::Rgb(187, 154, 247),
        idle: Color::Rgb(86, 95, 137),
        stale: Color::Rgb(65, 72, 104),
        border: Color::Rgb(59, 66, 97),
        highlight: Color::Rgb(187, 154, 247),
    };

    pub const LIGHT: Palette = Palette {
        fg: Color::Rgb(52, 59, 88),
        dim: Color::Rgb(132, 138, 168),
        running: Color::Rgb(46, 89, 168),
        attention: Color::Rgb(177, 94, 29),
        waiting: Color::Rgb(143, 94, 21),
        compacting: Color::Rgb(120, 74, 189),
        idle: Color::Rgb(132, 138, 168),
        stale: Color::Rgb(160, 164, 185),
        border: Color::Rgb(180, 185, 205),
        highlight: Color::Rgb(120, 74, 189),
    };
}

/// Persisted appearance configuration (`config.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HudConfig {
    #[serde(default)]
    pub theme: Theme,
}

/// Position of one overlay surface in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfacePosition {
    pub x: f64,
    pub y: f64,
}

impl Default for SurfacePosition {
    fn default() -> Self {
        Self { x: 24.0, y: 24.0 }
    }
}

/// Persisted surface positions (`state.json`). The indicator and the session
/// list are independently positionable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HudState {
    #[serde(default)]
    pub indicator: SurfacePosition,
    #[serde(default)]
    pub session_list: SurfacePosition,
}

/// Per-user data directory for the two persisted files
fn data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "aura").map(|dirs| dirs.data_dir().to_path_buf())
}

fn load_json<T: Default + for<'de> Deserialize<'de>>(file: &str) -> T {
    let Some(path) = data_dir().map(|d| d.join(file)) else {
        return T::default();
    };
    match std::fs::read_to_string(&path) {
        Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
            tracing::warn!("Malformed {file}, using defaults: {e}");
            T::default()
        }),
        Err(_) => T::default(),
    }
}

fn save_json<T: Serialize>(file: &str, value: &T) {
    let Some(dir) = data_dir() else { return };
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!("Could not create data dir {:?}: {e}", dir);
        return;
    }
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            if let Err(e) = std::fs::write(dir.join(file), text) {
                tracing::warn!("Could not write {file}: {e}");
            }
        }
        Err(e) => tracing::warn!("Could not serialize {file}: {e}"),
    }
}

impl HudConfig {
    pub fn load() -> Self {
        load_json("config.json")
    }

    pub fn save(&self) {
        save_json("config.json", self);
    }
}

impl HudState {
    pub fn load() -> Self {
        load_json("state.json")
    }

    pub fn save(&self) {
        save_json("state.json", self);
    }
}
