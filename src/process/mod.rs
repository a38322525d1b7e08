//! Execution context processes: identity, spawning, and teardown.
//!
//! A context is one isolated interpreter instance. The manager only sees it
//! through [`Worker`], so the Python child process and the scripted worker
//! used in tests are interchangeable.

use std::fmt;

use tokio::sync::mpsc;

use crate::errors::RuntimeError;
use crate::execution::protocol::{ControlMessage, Envelope};

pub mod python;

#[cfg(test)]
pub mod scripted;

/// Identity of one context instance. Strictly increasing, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker#{}", self.0)
    }
}

/// Inbound side shared by every instance; each envelope names its sender.
pub type EventSender = mpsc::UnboundedSender<Envelope>;
pub type Inbox = mpsc::UnboundedReceiver<Envelope>;

pub trait Worker: Send {
    /// Queue a message for the context. Never blocks.
    fn send(&mut self, message: ControlMessage) -> Result<(), RuntimeError>;

    /// Kill the context immediately, whatever it is doing.
    fn terminate(&mut self);
}

pub trait WorkerSpawner: Send {
    fn spawn(&mut self, id: WorkerId, events: EventSender)
        -> Result<Box<dyn Worker>, RuntimeError>;
}
