//! Fan-out of serialized snapshots to live subscribers.

use crate::vehicle::VehicleSnapshot;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Receives serialized JSON snapshots of the simulation.
pub trait StateSink: Send + Sync {
    fn publish(&self, message: &str);
}

/// The per-tick vehicle snapshot.
#[derive(Serialize)]
pub struct CarsMessage<'a> {
    pub cars: &'a [VehicleSnapshot],
}

/// The per-tick clock snapshot.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeMessage<'a> {
    pub simulated_time: &'a str,
}

/// Serializes a message, logging rather than propagating failures.
pub(crate) fn encode<T: Serialize>(message: &T) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(json) => Some(json),
        Err(err) => {
            log::error!("Failed to serialize snapshot: {}", err);
            None
        }
    }
}

/// A [StateSink] which forwards each message to every subscribed channel.
///
/// Clones share the same subscriber list. A subscriber whose receiver has been
/// dropped is removed on the next send without affecting the others.
#[derive(Clone, Default)]
pub struct Broadcaster {
    subscribers: Arc<Mutex<Vec<UnboundedSender<String>>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber.
    pub fn subscribe(&self) -> UnboundedReceiver<String> {
        let (tx, rx) = unbounded_channel();
        let mut subscribers = self.lock();
        subscribers.push(tx);
        log::info!("Subscriber connected ({} total)", subscribers.len());
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }

    /// Drops every subscriber, closing their channels.
    pub fn disconnect_all(&self) {
        let mut subscribers = self.lock();
        if !subscribers.is_empty() {
            log::info!("Disconnecting {} subscribers", subscribers.len());
        }
        subscribers.clear();
    }

    /// Sends a message to every subscriber.
    pub fn send(&self, message: &str) {
        self.lock().retain(|tx| match tx.send(message.to_string()) {
            Ok(()) => true,
            Err(_) => {
                log::warn!("Dropping disconnected subscriber");
                false
            }
        });
    }

    fn lock(&self) -> MutexGuard<'_, Vec<UnboundedSender<String>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl StateSink for Broadcaster {
    fn publish(&self, message: &str) {
        self.send(message);
    }
}

/// A sink which keeps every message, for inspecting what was published.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl StateSink for RecordingSink {
    fn publish(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
