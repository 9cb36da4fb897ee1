//! Event system for editor notifications.
//!
//! ## Learning: Observer Pattern in Rust
//!
//! Rust's ownership model makes classic observer lists awkward. Instead
//! `tokio::sync::broadcast` carries events as plain values:
//! - No callbacks or object references to manage
//! - Every subscriber receives its own clone
//! - A slow subscriber lags instead of blocking the editor
//!
//! Alerts are the editor's status sink: refused operations, parse errors and
//! evaluator failures all arrive as [`EditorEvent::Alert`].

use crate::document::DocumentId;
use tokio::sync::broadcast;

/// Events that can occur in the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// The tree changed
    DocumentChanged(DocumentId),
    /// The document was written to disk
    DocumentSaved(DocumentId),
    /// The cursor moved without changing the tree
    CursorMoved(DocumentId),
    /// Something was pushed onto or popped off the kill ring
    ClipboardChanged,
    /// A user-visible message
    Alert(String),
    /// Configuration was replaced
    ConfigChanged,
}

/// Event bus for broadcasting editor events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EditorEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Emits an event to all subscribers.
    pub fn emit(&self, event: EditorEvent) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    /// Returns a receiver for all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper for processing events asynchronously.
///
/// ```ignore
/// let mut handler = EventHandler::new(editor.subscribe());
/// tokio::spawn(async move {
///     while let Some(event) = handler.next().await {
///         if let EditorEvent::Alert(msg) = event {
///             eprintln!("{msg}");
///         }
///     }
/// });
/// ```
pub struct EventHandler {
    receiver: broadcast::Receiver<EditorEvent>,
}

impl EventHandler {
    pub fn new(receiver: broadcast::Receiver<EditorEvent>) -> Self {
        Self { receiver }
    }

    /// Waits for the next event, skipping over any that were missed.
    pub async fn next(&mut self) -> Option<EditorEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Event handler lagged, missed {} events", n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Drains every event already queued, without waiting.
    pub fn drain(&mut self) -> Vec<EditorEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return events,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(EditorEvent::Alert("hi".into()));

        let event = rx.recv().await.unwrap();
        assert_eq!(event, EditorEvent::Alert("hi".into()));
    }

    #[tokio::test]
    async fn test_handler_next_and_drain() {
        let bus = EventBus::new();
        let mut handler = EventHandler::new(bus.subscribe());

        bus.emit(EditorEvent::ConfigChanged);
        bus.emit(EditorEvent::ClipboardChanged);
        assert_eq!(handler.next().await, Some(EditorEvent::ConfigChanged));
        assert_eq!(handler.drain(), vec![EditorEvent::ClipboardChanged]);
        assert!(handler.drain().is_empty());
    }
}
