//! Keyboard input listener for the HUD frame loop

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Listen for keyboard input events with graceful shutdown support
pub async fn listen(tx: mpsc::Sender<KeyEvent>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!("Input listener cancelled");
                break;
            }
            () = tokio::time::sleep(Duration::from_millis(100)) => {
                // Non-blocking poll (Duration::ZERO) since we're already on a timeout
                if event::poll(Duration::ZERO).unwrap_or(false) {
                    if let Ok(CrosstermEvent::Key(key)) = event::read() {
                        if tx.send(key).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }
}
