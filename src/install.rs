//! `aura hook-install`: print the hooks block for the agent's settings file
//!
//! Printing instead of editing keeps the subcommand side-effect free; the
//! user pastes the block into `.claude/settings.json` (or merges it with an
//! existing `hooks` table).

/// Binary path placed into the hook commands, overridable for non-standard
/// installs via `AURA_PATH`.
fn aura_path() -> String {
    std::env::var("AURA_PATH").unwrap_or_else(|_| "aura".to_string())
}

/// Settings block wiring every hook aura consumes to `aura hook`
pub fn hooks_block() -> String {
    let path = aura_path();
    let hook = format!("{path} hook --agent claude-code");
    let entries = [
        ("SessionStart", 5),
        ("UserPromptSubmit", 5),
        ("PreToolUse", 10),
        ("PostToolUse", 10),
        ("PostToolUseFailure", 10),
        ("Notification", 5),
        ("PermissionRequest", 10),
        ("Stop", 10),
        ("PreCompact", 10),
        ("SubagentStart", 5),
        ("SubagentStop", 5),
        ("SessionEnd", 5),
    ];

    let body: Vec<String> = entries
        .iter()
        .map(|(name, timeout)| {
            format!(
                r#"    "{name}": [{{
      "matcher": "*",
      "hooks": [{{ "type": "command", "command": "{hook}", "timeout": {timeout} }}]
    }}]"#
            )
        })
        .collect();

    format!("{{\n  \"hooks\": {{\n{}\n  }}\n}}", body.join(",\n"))
}

pub fn run() {
    println!("{}", hooks_block());
}
