//! The run's event stream: an accumulating, fan-out-able publisher.
//!
//! Grounded in the teacher crate's `stream.rs` channel wiring, generalized so
//! that a subscriber joining after the run has started still receives every
//! event published so far (replay), followed by anything published after it
//! subscribed (live tail) — the two phases share one lock acquisition so no
//! event can be published, and therefore missed, between them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::mpsc;

use conduit_core::{Message, ToolCall};

use crate::provider::FinishReason;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A streamed content fragment from the model.
    Token { text: String, at: DateTime<Utc> },
    /// A complete message appended to the conversation (assistant or tool).
    Message { message: Message, at: DateTime<Utc> },
    /// The result of dispatching one tool call.
    ToolResult {
        call: ToolCall,
        output: String,
        is_error: bool,
        at: DateTime<Utc>,
    },
    /// Control was handed off to a different agent.
    Handoff {
        from_agent: String,
        to_agent: String,
        prompt: Option<String>,
        at: DateTime<Utc>,
    },
    /// The run ended for a reason other than a clean stop.
    Error { message: String, at: DateTime<Utc> },
    /// The provider signalled it has nothing further to add for this turn.
    Finished {
        reason: FinishReason,
        at: DateTime<Utc>,
    },
}

struct Inner {
    accumulated: Vec<Event>,
    subscribers: Vec<mpsc::UnboundedSender<Event>>,
    closed: bool,
}

/// Single-producer, multi-subscriber accumulator for one run's events.
///
/// Cloning shares the same underlying state (`Arc`-like via the inner
/// `Mutex`), so the loop driver and every `Response` handle observe the same
/// stream.
#[derive(Clone)]
pub struct EventHub {
    inner: std::sync::Arc<Mutex<Inner>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            inner: std::sync::Arc::new(Mutex::new(Inner {
                accumulated: Vec::new(),
                subscribers: Vec::new(),
                closed: false,
            })),
        }
    }

    /// Record an event and forward it to every live subscriber. Subscribers
    /// whose receiver has been dropped are pruned on the next publish.
    pub fn publish(&self, event: Event) {
        let mut inner = self.inner.lock().expect("event hub lock poisoned");
        inner
            .subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
        inner.accumulated.push(event);
    }

    /// Mark the run as finished. No further events will be published.
    pub fn close(&self) {
        self.inner.lock().expect("event hub lock poisoned").closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().expect("event hub lock poisoned").closed
    }

    /// Replay everything published so far, then (unless already closed)
    /// register to receive anything published after this call returns.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().expect("event hub lock poisoned");
        for event in &inner.accumulated {
            // Replay is best-effort: an unbounded channel never applies
            // backpressure here, so this can't block or fail from fullness.
            let _ = tx.send(event.clone());
        }
        if !inner.closed {
            inner.subscribers.push(tx);
        }
        rx
    }

    pub fn accumulated(&self) -> Vec<Event> {
        self.inner
            .lock()
            .expect("event hub lock poisoned")
            .accumulated
            .clone()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
