//! Execution runtime manager.
//!
//! Owns the single execution context, the single-slot run queue, the status
//! machine, and the output sink. Every operation returns immediately; replies
//! from the context arrive later as [`Envelope`]s that the owner feeds to
//! [`RuntimeManager::handle`]. Envelopes from an instance that has since been
//! replaced are dropped, so a killed run can never touch the current state.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use super::output::{Channel, OutputRecord, OutputSink, DEFAULT_OUTPUT_LIMIT_BYTES};
use super::protocol::{ControlMessage, Envelope, Inbound, Phase, WorkerEvent};
use super::queue::{has_runnable_source, RunRequest, RunSlot};
use super::status::{ExecutionStatus, StatusEvent, StatusMachine};
use crate::errors::RuntimeError;
use crate::process::{EventSender, Inbox, Worker, WorkerId, WorkerSpawner};

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub output_limit_bytes: usize,
    /// `None` leaves a hung run alone until the user stops it.
    pub run_timeout: Option<Duration>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
            run_timeout: None,
        }
    }
}

/// Change notifications for front ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeNotice {
    Status {
        status: ExecutionStatus,
        label: &'static str,
    },
    Output(OutputRecord),
    OutputCleared,
    /// A submitted run concluded, whether or not it got to execute.
    RunFinished {
        status: ExecutionStatus,
        elapsed: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing to run; the context was not touched.
    Rejected,
    /// Waiting for the context to become ready.
    Queued,
    Dispatched,
}

struct ExecutionContext {
    id: WorkerId,
    worker: Box<dyn Worker>,
    ready: bool,
}

struct InFlight {
    worker: WorkerId,
    started_at: Instant,
    failed: bool,
}

pub struct RuntimeManager {
    spawner: Box<dyn WorkerSpawner>,
    events: EventSender,
    last_id: u64,
    context: Option<ExecutionContext>,
    slot: RunSlot,
    in_flight: Option<InFlight>,
    status: StatusMachine,
    sink: OutputSink,
    settings: RuntimeSettings,
    subscribers: Vec<mpsc::UnboundedSender<RuntimeNotice>>,
}

impl RuntimeManager {
    pub fn new(settings: RuntimeSettings, spawner: Box<dyn WorkerSpawner>) -> (Self, Inbox) {
        let (events, inbox) = mpsc::unbounded_channel();
        let manager = Self {
            spawner,
            events,
            last_id: 0,
            context: None,
            slot: RunSlot::default(),
            in_flight: None,
            status: StatusMachine::default(),
            sink: OutputSink::with_limit(settings.output_limit_bytes),
            settings,
            subscribers: Vec::new(),
        };
        (manager, inbox)
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<RuntimeNotice> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status.current()
    }

    pub fn output(&self) -> &[OutputRecord] {
        self.sink.records()
    }

    pub fn current_worker(&self) -> Option<WorkerId> {
        self.context.as_ref().map(|c| c.id)
    }

    pub fn is_ready(&self) -> bool {
        self.context.as_ref().map(|c| c.ready).unwrap_or(false)
    }

    pub fn has_run_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Create the context ahead of the first run. No-op if one exists.
    pub fn warmup(&mut self) -> Result<(), RuntimeError> {
        if self.context.is_some() {
            return Ok(());
        }
        self.create()
    }

    pub fn submit(&mut self, code: &str) -> Result<SubmitOutcome, RuntimeError> {
        if self.in_flight.is_some() {
            return Err(RuntimeError::RunInFlight);
        }
        if !has_runnable_source(code) {
            self.record(Channel::Info, "Nothing to run: the editor is empty.");
            return Ok(SubmitOutcome::Rejected);
        }

        let request = RunRequest::new(code);
        if self.is_ready() {
            self.dispatch(request)?;
            return Ok(SubmitOutcome::Dispatched);
        }
        if self.context.is_none() {
            self.create()?;
        }
        if self.slot.offer(request).is_some() {
            log::debug!("replaced the queued run with a newer submission");
        }
        self.set_status(StatusEvent::Preparing);
        self.record(
            Channel::Info,
            "Preparing the Python runtime; your code will run once it is ready.",
        );
        Ok(SubmitOutcome::Queued)
    }

    /// Stop the in-flight run by replacing the whole context.
    pub fn cancel(&mut self) -> bool {
        let Some(run) = self.in_flight.take() else {
            return false;
        };
        log::info!("cancelling run on {}", run.worker);
        self.set_status(StatusEvent::Cancelled);
        self.record(Channel::Info, "Execution stopped.");
        self.notify(RuntimeNotice::RunFinished {
            status: ExecutionStatus::Stopped,
            elapsed: run.started_at.elapsed(),
        });
        self.rebuild();
        true
    }

    /// Tear down the current context without draining it and start a new one.
    pub fn rebuild(&mut self) {
        if let Some(mut context) = self.context.take() {
            log::info!("rebuilding: tearing down {}", context.id);
            context.worker.terminate();
        }
        self.in_flight = None;
        if let Err(e) = self.create() {
            log::error!("rebuild failed: {}", e);
        }
    }

    /// Stop a run that has outlived the configured timeout.
    pub fn check_deadline(&mut self, now: Instant) -> bool {
        let (Some(limit), Some(run)) = (self.settings.run_timeout, self.in_flight.as_ref()) else {
            return false;
        };
        if now.saturating_duration_since(run.started_at) < limit {
            return false;
        }
        log::warn!("run on {} exceeded {:?}", run.worker, limit);
        self.record(
            Channel::Info,
            format!(
                "Execution exceeded the {} second time limit.",
                limit.as_secs_f64()
            ),
        );
        self.cancel()
    }

    /// Handle everything currently waiting in `inbox`.
    pub fn pump(&mut self, inbox: &mut Inbox) -> usize {
        let mut handled = 0;
        while let Ok(envelope) = inbox.try_recv() {
            self.handle(envelope);
            handled += 1;
        }
        handled
    }

    pub fn handle(&mut self, envelope: Envelope) {
        if self.current_worker() != Some(envelope.worker) {
            log::debug!(
                "dropping {:?} from superseded {}",
                envelope.inbound,
                envelope.worker
            );
            return;
        }
        match envelope.inbound {
            Inbound::Fault(reason) => self.context_fault(&reason),
            Inbound::Event(event) => self.on_event(event),
        }
    }

    fn on_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Ready => self.on_ready(),
            WorkerEvent::Status { phase } => match phase {
                Phase::Loading | Phase::Running => log::debug!("worker phase {:?}", phase),
                Phase::Success if self.in_flight.is_some() => {
                    self.set_status(StatusEvent::RunSucceeded)
                }
                Phase::Error if self.in_flight.is_some() => {
                    self.mark_failed();
                    self.set_status(StatusEvent::RunFailed)
                }
                _ => log::debug!("phase {:?} outside a run", phase),
            },
            WorkerEvent::Stdout { text } => self.record_run_output(Channel::Stdout, text),
            WorkerEvent::Stderr { text } => self.record_run_output(Channel::Stderr, text),
            WorkerEvent::RuntimeError { text } => {
                self.record(Channel::Error, text);
                if self.in_flight.is_some() {
                    self.mark_failed();
                    self.set_status(StatusEvent::RunFailed);
                }
            }
            WorkerEvent::Done => self.on_done(),
        }
    }

    fn on_ready(&mut self) {
        let Some(context) = self.context.as_mut() else {
            return;
        };
        if context.ready {
            log::warn!("{} reported ready twice; ignoring", context.id);
            return;
        }
        context.ready = true;
        log::info!("{} is ready", context.id);

        match self.slot.take() {
            Some(request) => {
                if let Err(e) = self.dispatch(request) {
                    log::error!("queued run could not be dispatched: {}", e);
                }
            }
            None => self.set_status(StatusEvent::ContextReady),
        }
    }

    fn on_done(&mut self) {
        let Some(run) = self.in_flight.take() else {
            log::warn!("done received with no run in flight; ignoring");
            return;
        };
        if self.status() == ExecutionStatus::Running {
            let settle = if run.failed {
                StatusEvent::RunFailed
            } else {
                StatusEvent::RunSucceeded
            };
            self.set_status(settle);
        }
        log::info!("run on {} finished as {}", run.worker, self.status());
        self.notify(RuntimeNotice::RunFinished {
            status: self.status(),
            elapsed: run.started_at.elapsed(),
        });
    }

    fn dispatch(&mut self, request: RunRequest) -> Result<(), RuntimeError> {
        if self.in_flight.is_some() {
            return Err(RuntimeError::RunInFlight);
        }
        let id = match self.context.as_ref() {
            Some(context) if context.ready => context.id,
            _ => return Err(RuntimeError::NotReady),
        };

        self.clear_output();
        self.set_status(StatusEvent::Dispatched);
        self.in_flight = Some(InFlight {
            worker: id,
            started_at: Instant::now(),
            failed: false,
        });
        log::info!(
            "dispatching {} bytes to {} (submitted {:?} ago)",
            request.code.len(),
            id,
            request.submitted_at.elapsed()
        );

        let sent = match self.context.as_mut() {
            Some(context) => context.worker.send(ControlMessage::Run { code: request.code }),
            None => Err(RuntimeError::NotReady),
        };
        if let Err(e) = sent {
            self.context_fault(&e.to_string());
        }
        Ok(())
    }

    fn create(&mut self) -> Result<(), RuntimeError> {
        self.last_id += 1;
        let id = WorkerId(self.last_id);
        self.set_status(StatusEvent::Preparing);

        let mut worker = match self.spawner.spawn(id, self.events.clone()) {
            Ok(worker) => worker,
            Err(e) => {
                self.warmup_failed(&e.to_string());
                return Err(e);
            }
        };
        log::info!("warming up {}", id);
        if let Err(e) = worker.send(ControlMessage::Warmup) {
            worker.terminate();
            self.warmup_failed(&e.to_string());
            return Err(e);
        }
        self.context = Some(ExecutionContext {
            id,
            worker,
            ready: false,
        });
        Ok(())
    }

    fn context_fault(&mut self, reason: &str) {
        let Some(mut context) = self.context.take() else {
            return;
        };
        context.worker.terminate();
        if !context.ready {
            self.warmup_failed(reason);
            return;
        }

        log::warn!("{} faulted: {}", context.id, reason);
        let lost = self.in_flight.take();
        self.set_status(StatusEvent::Fault);
        self.record(
            Channel::Error,
            format!("Worker error: {}. Restarting the Python runtime.", reason),
        );
        if let Some(run) = lost {
            self.notify(RuntimeNotice::RunFinished {
                status: ExecutionStatus::Error,
                elapsed: run.started_at.elapsed(),
            });
        }
        self.rebuild();
    }

    // No automatic retry: the next user action creates a fresh context.
    fn warmup_failed(&mut self, reason: &str) {
        log::error!("execution context failed to load: {}", reason);
        self.context = None;
        self.set_status(StatusEvent::WarmupFailed);
        self.record(
            Channel::Error,
            format!("Python runtime failed to load: {}", reason),
        );
        if let Some(request) = self.slot.take() {
            self.notify(RuntimeNotice::RunFinished {
                status: ExecutionStatus::Error,
                elapsed: request.submitted_at.elapsed(),
            });
        }
    }

    fn mark_failed(&mut self) {
        if let Some(run) = self.in_flight.as_mut() {
            run.failed = true;
        }
    }

    fn record_run_output(&mut self, channel: Channel, text: String) {
        if self.in_flight.is_some() {
            self.record(channel, text);
        } else {
            log::debug!("{:?} output outside a run: {}", channel, text);
        }
    }

    fn record(&mut self, channel: Channel, text: impl Into<String>) {
        for stored in self.sink.push(OutputRecord::new(channel, text)) {
            self.notify(RuntimeNotice::Output(stored));
        }
    }

    fn clear_output(&mut self) {
        self.sink.clear();
        self.notify(RuntimeNotice::OutputCleared);
    }

    fn set_status(&mut self, event: StatusEvent) {
        if let Some(status) = self.status.apply(event) {
            self.notify(RuntimeNotice::Status {
                status,
                label: status.label(),
            });
        }
    }

    fn notify(&mut self, notice: RuntimeNotice) {
        self.subscribers.retain(|tx| tx.send(notice.clone()).is_ok());
    }
}

impl Drop for RuntimeManager {
    fn drop(&mut self) {
        if let Some(mut context) = self.context.take() {
            context.worker.terminate();
        }
    }
}
