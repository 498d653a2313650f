use crate::{RunId, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Kinds of run-lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    RunStarted,
    NodeCompleted,
    NodeFailed,
    RunCompleted,
}

/// Events emitted during a workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    RunStarted {
        run_id: RunId,
        node_count: usize,
        timestamp: DateTime<Utc>,
    },
    NodeCompleted {
        run_id: RunId,
        node: String,
        result: Value,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    NodeFailed {
        run_id: RunId,
        node: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        run_id: RunId,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl ExecutionEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            ExecutionEvent::RunStarted { .. } => EventType::RunStarted,
            ExecutionEvent::NodeCompleted { .. } => EventType::NodeCompleted,
            ExecutionEvent::NodeFailed { .. } => EventType::NodeFailed,
            ExecutionEvent::RunCompleted { .. } => EventType::RunCompleted,
        }
    }

    pub fn run_id(&self) -> RunId {
        match self {
            ExecutionEvent::RunStarted { run_id, .. }
            | ExecutionEvent::NodeCompleted { run_id, .. }
            | ExecutionEvent::NodeFailed { run_id, .. }
            | ExecutionEvent::RunCompleted { run_id, .. } => *run_id,
        }
    }
}

pub type EventHandler = Arc<dyn Fn(&ExecutionEvent) + Send + Sync>;

/// Synchronous publish/subscribe bus for run-lifecycle events.
///
/// `publish` calls every handler subscribed to the event's type on the
/// caller's stack, in subscription order, before returning.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<EventType, Vec<EventHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, event_type: EventType, handler: F)
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        let list = handlers.entry(event_type).or_default();
        list.push(Arc::new(handler));
        tracing::debug!("Subscribed handler #{} to {:?}", list.len(), event_type);
    }

    pub fn publish(&self, event: &ExecutionEvent) {
        // Handlers run outside the lock; they may subscribe or publish in turn.
        let targets: Vec<EventHandler> = {
            let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
            match handlers.get(&event.event_type()) {
                Some(list) => list.clone(),
                None => return,
            }
        };

        for handler in targets {
            handler(event);
        }
    }

    pub fn handler_count(&self, event_type: EventType) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&event_type)
            .map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        let counts: HashMap<&EventType, usize> =
            handlers.iter().map(|(k, v)| (k, v.len())).collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}
