//! Wire protocol between the controller and an execution context.
//!
//! Each message is one JSON object on its own line. Both directions are closed
//! sum types so a new message kind is a compile-time change on both ends.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::process::WorkerId;

/// Controller -> context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlMessage {
    /// Load the interpreter and install the sandbox gates.
    Warmup,
    /// Execute a snapshot of the editor text.
    Run { code: String },
}

/// Informational phase reported by the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Loading,
    Running,
    Success,
    Error,
}

/// Context -> controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkerEvent {
    /// Interpreter loaded, gates installed, context usable.
    Ready,
    Status { phase: Phase },
    Stdout { text: String },
    Stderr { text: String },
    /// Error raised by the executed code (including gate rejections).
    RuntimeError { text: String },
    /// Sent exactly once per dispatched run, from a `finally` position.
    Done,
}

/// What a context instance delivered: a protocol event or a transport fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Event(WorkerEvent),
    Fault(String),
}

/// An inbound message tagged with the instance that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub worker: WorkerId,
    pub inbound: Inbound,
}

impl Envelope {
    pub fn event(worker: WorkerId, event: WorkerEvent) -> Self {
        Self {
            worker,
            inbound: Inbound::Event(event),
        }
    }

    pub fn fault(worker: WorkerId, reason: impl Into<String>) -> Self {
        Self {
            worker,
            inbound: Inbound::Fault(reason.into()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed message from worker: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("empty message line")]
    Empty,
}

/// Serialise one control message as a single NDJSON line.
pub fn encode(message: &ControlMessage) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Decode one line written by the context.
pub fn decode(line: &str) -> Result<WorkerEvent, ProtocolError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::Empty);
    }
    Ok(serde_json::from_str(trimmed)?)
}
