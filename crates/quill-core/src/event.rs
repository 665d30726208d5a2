//! Host notifications.
//!
//! ## Learning: Observer Pattern in Rust
//!
//! Rust's ownership model makes traditional observer patterns tricky.
//! We use `tokio::sync::broadcast` for a safe, async-friendly event bus.
//!
//! Key differences from OOP observers:
//! - No object references to manage
//! - Events are values, not callbacks
//! - Subscribers receive copies (Clone)
//!
//! A host that drives the editor synchronously drains its receiver with
//! `try_recv` after each key; an async host awaits [`EventHandler::next`].

use quill_doc::{DocumentValue, PageKey, RecordId};
use tokio::sync::broadcast;

use crate::editor::SessionId;

/// Something the host should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// The document value changed
    Changed(DocumentValue),
    /// The editor lost focus
    Blurred,
    /// Backspace left the document as a single empty block
    Deleted,
    /// Shift+Enter: move on to the next field
    Advance,
    /// A record reference was activated
    NavigateToRecord(RecordId),
    /// A page reference was activated
    NavigateToPage(PageKey),
    /// A dice roller was activated
    RollDice(String),
}

/// An event tagged with the session that raised it.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub session: SessionId,
    pub event: EditorEvent,
}

/// Event bus for broadcasting notifications.
///
/// Several editor sessions may share one bus; each notification carries
/// its session id.
pub struct EventBus {
    sender: broadcast::Sender<Notification>,
}

impl EventBus {
    /// Creates a new event bus.
    pub fn new() -> Self {
        // Capacity of 256 events in the buffer
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Emits a notification to all subscribers.
    pub fn emit(&self, notification: Notification) {
        // Ignore error if no receivers (not a problem)
        let _ = self.sender.send(notification);
    }

    /// Subscribes to notifications.
    ///
    /// Returns a receiver that will get all future notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

/// Helper for processing notifications asynchronously.
///
/// ## Example
///
/// ```ignore
/// let mut handler = EventHandler::new(editor.subscribe());
///
/// tokio::spawn(async move {
///     while let Some(notification) = handler.next().await {
///         if let EditorEvent::Changed(value) = notification.event {
///             store.save(notification.session, value);
///         }
///     }
/// });
/// ```
pub struct EventHandler {
    receiver: broadcast::Receiver<Notification>,
}

impl EventHandler {
    /// Creates a new event handler.
    pub fn new(receiver: broadcast::Receiver<Notification>) -> Self {
        Self { receiver }
    }

    /// Waits for the next notification.
    pub async fn next(&mut self) -> Option<Notification> {
        loop {
            match self.receiver.recv().await {
                Ok(notification) => return Some(notification),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Event handler lagged, missed {} events", n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns every notification already queued, without waiting.
    pub fn drain(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(notification) => out.push(notification),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!("Event handler lagged, missed {} events", n);
                }
                Err(_) => return out,
            }
        }
    }
}
