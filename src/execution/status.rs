//! Externally observable execution status and its transition table.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStatus {
    #[default]
    Idle,
    Loading,
    Running,
    Success,
    Error,
    Stopped,
}

impl ExecutionStatus {
    pub fn label(self) -> &'static str {
        match self {
            ExecutionStatus::Idle => "Ready",
            ExecutionStatus::Loading => "Loading Python runtime...",
            ExecutionStatus::Running => "Running...",
            ExecutionStatus::Success => "Finished",
            ExecutionStatus::Error => "Finished with errors",
            ExecutionStatus::Stopped => "Stopped",
        }
    }

    /// Whether the run trigger is enabled.
    pub fn can_run(self) -> bool {
        self != ExecutionStatus::Running
    }

    /// Whether the stop trigger is enabled.
    pub fn can_stop(self) -> bool {
        self == ExecutionStatus::Running
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionStatus::Idle => "idle",
            ExecutionStatus::Loading => "loading",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Error => "error",
            ExecutionStatus::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Inputs that may move the status. Only protocol events and user
/// cancellation produce these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// A context is being created or warmed up.
    Preparing,
    /// The context reported `ready` and nothing was queued.
    ContextReady,
    /// A run request was sent to a ready context.
    Dispatched,
    RunSucceeded,
    RunFailed,
    Cancelled,
    /// The context itself failed.
    Fault,
    WarmupFailed,
}

#[derive(Debug, Default)]
pub struct StatusMachine {
    current: ExecutionStatus,
}

impl StatusMachine {
    pub fn current(&self) -> ExecutionStatus {
        self.current
    }

    /// Apply `event`, returning the new status when it changed.
    pub fn apply(&mut self, event: StatusEvent) -> Option<ExecutionStatus> {
        use ExecutionStatus::*;
        use StatusEvent::*;

        let next = match (self.current, event) {
            (Running, Preparing) => None,
            (_, Preparing) => Some(Loading),
            (Loading, ContextReady) => Some(Idle),
            (Running, Dispatched) => None,
            (_, Dispatched) => Some(Running),
            (Running, RunSucceeded) => Some(Success),
            (Running, RunFailed) => Some(Error),
            (Running, Cancelled) => Some(Stopped),
            (_, Fault) | (_, WarmupFailed) => Some(Error),
            _ => None,
        };

        match next {
            Some(status) if status != self.current => {
                log::debug!("status {} -> {} on {:?}", self.current, status, event);
                self.current = status;
                Some(status)
            }
            Some(_) => None,
            None => {
                log::debug!("ignoring {:?} while {}", event, self.current);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(events: &[StatusEvent]) -> Vec<ExecutionStatus> {
        let mut machine = StatusMachine::default();
        events.iter().filter_map(|e| machine.apply(*e)).collect()
    }

    #[test]
    fn happy_path_from_cold_start() {
        use ExecutionStatus::*;
        let seen = drive(&[
            StatusEvent::Preparing,
            StatusEvent::Dispatched,
            StatusEvent::RunSucceeded,
        ]);
        assert_eq!(seen, vec![Loading, Running, Success]);
    }

    #[test]
    fn cancel_then_rebuild_reenters_loading() {
        use ExecutionStatus::*;
        let seen = drive(&[
            StatusEvent::Preparing,
            StatusEvent::ContextReady,
            StatusEvent::Dispatched,
            StatusEvent::Cancelled,
            StatusEvent::Preparing,
        ]);
        assert_eq!(seen, vec![Loading, Idle, Running, Stopped, Loading]);
    }

    #[test]
    fn warmup_failure_reaches_error_from_idle() {
        let mut machine = StatusMachine::default();
        assert_eq!(
            machine.apply(StatusEvent::WarmupFailed),
            Some(ExecutionStatus::Error)
        );
    }

    #[test]
    fn out_of_order_events_are_ignored() {
        let mut machine = StatusMachine::default();
        assert_eq!(machine.apply(StatusEvent::RunSucceeded), None);
        assert_eq!(machine.apply(StatusEvent::Cancelled), None);
        assert_eq!(machine.apply(StatusEvent::ContextReady), None);
        assert_eq!(machine.current(), ExecutionStatus::Idle);

        machine.apply(StatusEvent::Dispatched);
        assert_eq!(machine.apply(StatusEvent::Dispatched), None);
        assert_eq!(machine.apply(StatusEvent::Preparing), None);
        assert_eq!(machine.current(), ExecutionStatus::Running);
    }

    #[test]
    fn terminal_labels_accept_next_run() {
        for status in [
            ExecutionStatus::Success,
            ExecutionStatus::Error,
            ExecutionStatus::Stopped,
        ] {
            assert!(status.can_run());
            assert!(!status.can_stop());
        }
        assert!(!ExecutionStatus::Running.can_run());
        assert!(ExecutionStatus::Running.can_stop());
    }
}
