//! Single-slot run queue.

use std::time::Instant;

/// A pending execution job; the code is snapshotted at submission.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub code: String,
    pub submitted_at: Instant,
}

impl RunRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            submitted_at: Instant::now(),
        }
    }
}

/// Holds at most one request waiting for the context to become ready.
#[derive(Debug, Default)]
pub struct RunSlot {
    pending: Option<RunRequest>,
}

impl RunSlot {
    /// Store `request`, returning the one it replaced (last submission wins).
    pub fn offer(&mut self, request: RunRequest) -> Option<RunRequest> {
        self.pending.replace(request)
    }

    pub fn take(&mut self) -> Option<RunRequest> {
        self.pending.take()
    }
}

/// Returns `false` for code that is empty or whitespace only.
pub fn has_runnable_source(code: &str) -> bool {
    !code.trim().is_empty()
}
