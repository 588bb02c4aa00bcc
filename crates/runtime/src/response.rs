//! The caller-facing handle returned by [`crate::run`].

use conduit_core::Message;
use tokio::sync::mpsc;

use crate::cancel::CancelToken;
use crate::event::{Event, EventHub};

/// A live or completed run. Cheap to clone; every clone observes the same
/// underlying event hub and cancellation flag.
#[derive(Clone)]
pub struct Response {
    hub: EventHub,
    starting_messages: Vec<Message>,
    cancel: CancelToken,
}

impl Response {
    pub(crate) fn new(hub: EventHub, starting_messages: Vec<Message>, cancel: CancelToken) -> Self {
        Self {
            hub,
            starting_messages,
            cancel,
        }
    }

    /// Subscribe to this run's events. Replays everything published so far,
    /// then tails live events until the run closes the hub.
    pub fn stream(&self) -> mpsc::UnboundedReceiver<Event> {
        self.hub.subscribe()
    }

    /// The last `Message` event emitted during the run, or the default
    /// empty assistant message if the run never produced one.
    pub fn final_message(&self) -> Message {
        self.hub
            .accumulated()
            .into_iter()
            .rev()
            .find_map(|event| match event {
                Event::Message { message, .. } => Some(message),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// The full conversation: the messages the run started from, followed by
    /// every message event published during the run, in order.
    pub fn final_conversation(&self) -> Vec<Message> {
        let mut conversation = self.starting_messages.clone();
        conversation.extend(self.hub.accumulated().into_iter().filter_map(|event| match event {
            Event::Message { message, .. } => Some(message),
            _ => None,
        }));
        conversation
    }

    /// Request cooperative cancellation. Already-dispatched tool calls are
    /// not interrupted; the loop stops before its next step.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.hub.is_closed()
    }
}
