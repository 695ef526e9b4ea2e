//! Trigger dispatcher with a buffered message inbox.
//!
//! Messages may arrive from any thread through a [`MessageSender`]; they wait
//! in a channel until the next `dispatch` call, which feeds them to every
//! trigger in registration order, then feeds one bay-changed event, then
//! drains every trigger's queue.

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::error::BayError;
use crate::status::BayView;
use crate::triggers::{Command, Event, Trigger};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: String,
}

/// Cloneable handle for posting messages into a dispatcher's inbox.
#[derive(Debug, Clone)]
pub struct MessageSender {
    tx: Sender<InboundMessage>,
}

impl MessageSender {
    pub fn send(&self, topic: impl Into<String>, payload: impl Into<String>) -> Result<(), BayError> {
        self.tx
            .send(InboundMessage {
                topic: topic.into(),
                payload: payload.into(),
            })
            .map_err(|_| BayError::InboxClosed)
    }
}

/// Commands collected by one dispatch, split by destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dispatch {
    pub system: Vec<Command>,
    pub bay: Vec<Command>,
}

impl Dispatch {
    pub fn is_empty(&self) -> bool {
        self.system.is_empty() && self.bay.is_empty()
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    triggers: Vec<Trigger>,
    tx: Sender<InboundMessage>,
    rx: Receiver<InboundMessage>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            triggers: Vec::new(),
            tx,
            rx,
        }
    }

    /// Trigger ids are unique, compared case-insensitively.
    pub fn register(&mut self, trigger: Trigger) -> Result<(), BayError> {
        if self
            .triggers
            .iter()
            .any(|t| t.id().eq_ignore_ascii_case(trigger.id()))
        {
            return Err(BayError::Configuration(format!(
                "duplicate trigger id '{}'",
                trigger.id()
            )));
        }
        tracing::debug!(trigger = %trigger.id(), kind = trigger.kind().type_name(), "trigger registered");
        self.triggers.push(trigger);
        Ok(())
    }

    pub fn sender(&self) -> MessageSender {
        MessageSender {
            tx: self.tx.clone(),
        }
    }

    /// Post a message from the owning thread.
    pub fn post(&self, topic: impl Into<String>, payload: impl Into<String>) {
        // The dispatcher holds the receiver, so the channel can't be closed here.
        let _ = self.tx.send(InboundMessage {
            topic: topic.into(),
            payload: payload.into(),
        });
    }

    pub fn pending_messages(&self) -> usize {
        self.rx.len()
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// Every distinct topic the registered triggers listen on.
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = self.triggers.iter().filter_map(|t| t.kind().topic()).collect();
        topics.sort_unstable();
        topics.dedup();
        topics
    }

    pub fn dispatch(&mut self, view: &BayView) -> Dispatch {
        let messages: Vec<InboundMessage> = self.rx.try_iter().collect();
        for msg in &messages {
            let event = Event::Message {
                topic: &msg.topic,
                payload: &msg.payload,
            };
            let fired: usize = self
                .triggers
                .iter_mut()
                .map(|t| t.observe(&event, view))
                .sum();
            if fired == 0 {
                tracing::trace!(topic = %msg.topic, "message produced no commands");
            }
        }
        for trigger in &mut self.triggers {
            trigger.observe(&Event::BayChanged, view);
        }

        let mut out = Dispatch::default();
        for trigger in self.triggers.iter_mut().filter(|t| t.triggered()) {
            let drained = trigger.drain();
            if trigger.is_system() {
                out.system.extend(drained);
            } else {
                out.bay.extend(drained);
            }
        }
        if !out.is_empty() {
            tracing::debug!(system = ?out.system, bay = ?out.bay, "dispatched commands");
        }
        out
    }
}
