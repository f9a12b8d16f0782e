//! Typed events emitted by the controllers.

use crossbeam_channel::{unbounded, Receiver, Sender};
use shared::domain::PaymentId;

use crate::feedback::Notice;

#[derive(Debug, Clone, PartialEq)]
pub enum WizardEvent {
    StepAdvanced { from: usize, to: usize },
    StepReverted { from: usize, to: usize },
    AdvanceBlocked { step: usize, missing: Vec<&'static str> },
    SubmitStarted { step: usize },
    SubmitSucceeded { step: usize },
    SubmitFailed { step: usize, notice: Notice },
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    Processing,
    Succeeded { payment_id: PaymentId },
    Redirected { url: String },
    Failed { notice: Notice },
    Reset,
}

/// Fan-out of events to any number of subscribers. Subscribers that drop
/// their receiver are pruned on the next emit.
#[derive(Debug)]
pub struct EventHub<E> {
    subscribers: Vec<Sender<E>>,
}

impl<E> Default for EventHub<E> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<E: Clone> EventHub<E> {
    pub fn subscribe(&mut self) -> Receiver<E> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn emit(&mut self, event: E) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
