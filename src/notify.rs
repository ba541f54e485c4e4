//! Cross-platform native desktop notifications
//!
//! Uses notify-rust for native notifications on macOS, Linux, and BSD. Fired
//! by the hook adapter when a session needs attention, so the user hears
//! about permission prompts even with the HUD hidden.

use notify_rust::Notification;

/// Send a desktop notification without blocking the caller
pub fn send(title: &str, message: &str) {
    let title = title.to_string();
    let message = message.to_string();

    std::thread::spawn(move || {
        let _ = Notification::new()
            .summary(&title)
            .body(&message)
            .timeout(5000) // 5 seconds
            .show();
    });
}
