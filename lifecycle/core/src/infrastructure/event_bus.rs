// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
// Event Bus - Pub/Sub for Lifecycle Notifications
//
// In-memory fan-out of lifecycle events over tokio broadcast channels.
// Subscribers may watch everything or a single involved object.
// Events are not persisted; a lagging receiver loses the oldest ones.

use crate::domain::events::{EventSender, EventType, LifecycleEvent};
use crate::domain::object::ObjectRef;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Event bus for publishing and subscribing to lifecycle events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<LifecycleEvent>>,
}

impl EventBus {
    /// Capacity is the number of buffered events before the oldest are dropped
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish(&self, event: LifecycleEvent) {
        debug!(reason = %event.reason_code, involved = %event.involved, "Publishing event");
        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
            involved: None,
        }
    }

    /// Subscribe to events about one object only
    pub fn subscribe_object(&self, involved: ObjectRef) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
            involved: Some(involved),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl EventSender for EventBus {
    fn send(&self, event: LifecycleEvent) {
        self.publish(event);
    }
}

/// Receiver for lifecycle events, optionally filtered by involved object
pub struct EventReceiver {
    receiver: broadcast::Receiver<LifecycleEvent>,
    involved: Option<ObjectRef>,
}

impl EventReceiver {
    /// Receive the next matching event
    pub async fn recv(&mut self) -> Result<LifecycleEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(|e| match e {
                broadcast::error::RecvError::Closed => EventBusError::Closed,
                broadcast::error::RecvError::Lagged(n) => {
                    warn!("Event receiver lagged by {} events", n);
                    EventBusError::Lagged(n)
                }
            })?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Receive a matching event without waiting
    pub fn try_recv(&mut self) -> Result<LifecycleEvent, EventBusError> {
        loop {
            let event = self.receiver.try_recv().map_err(|e| match e {
                broadcast::error::TryRecvError::Empty => EventBusError::Empty,
                broadcast::error::TryRecvError::Closed => EventBusError::Closed,
                broadcast::error::TryRecvError::Lagged(n) => {
                    warn!("Event receiver lagged by {} events", n);
                    EventBusError::Lagged(n)
                }
            })?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Every event currently buffered for this receiver
    pub fn drain(&mut self) -> Vec<LifecycleEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.try_recv() {
            events.push(event);
        }
        events
    }

    fn matches(&self, event: &LifecycleEvent) -> bool {
        self.involved.as_ref().map_or(true, |involved| &event.involved == involved)
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

/// Writes every event to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventSender;

impl EventSender for LoggingEventSender {
    fn send(&self, event: LifecycleEvent) {
        match event.event_type {
            EventType::Normal => info!(
                reason = %event.reason_code,
                involved = %event.involved,
                version = %event.version,
                "{}",
                event.message
            ),
            EventType::Warning => warn!(
                reason = %event.reason_code,
                involved = %event.involved,
                version = %event.version,
                "{}",
                event.message
            ),
        }
    }
}

/// Forwards every event to each inner sender
#[derive(Clone, Default)]
pub struct EventMultiplexer {
    senders: Vec<Arc<dyn EventSender>>,
}

impl EventMultiplexer {
    pub fn new(senders: Vec<Arc<dyn EventSender>>) -> Self {
        Self { senders }
    }

    pub fn with(mut self, sender: Arc<dyn EventSender>) -> Self {
        self.senders.push(sender);
        self
    }
}

impl EventSender for EventMultiplexer {
    fn send(&self, event: LifecycleEvent) {
        for sender in &self.senders {
            sender.send(event.clone());
        }
    }
}
