//! In-process worker that answers control messages from a script.

use std::sync::{Arc, Mutex};

use super::{EventSender, Worker, WorkerId, WorkerSpawner};
use crate::errors::RuntimeError;
use crate::execution::protocol::{ControlMessage, Envelope, Phase, WorkerEvent};

type Script = Arc<dyn Fn(&ControlMessage) -> Vec<WorkerEvent> + Send + Sync>;

/// What the scripted workers observed, shared with the test.
#[derive(Debug, Default)]
pub struct Journal {
    pub spawned: Vec<WorkerId>,
    pub sent: Vec<(WorkerId, ControlMessage)>,
    pub terminated: Vec<WorkerId>,
    /// Event senders handed to each instance, kept to inject late messages.
    pub senders: Vec<(WorkerId, EventSender)>,
}

impl Journal {
    pub fn runs_sent(&self) -> usize {
        self.sent
            .iter()
            .filter(|(_, m)| matches!(m, ControlMessage::Run { .. }))
            .count()
    }

    pub fn sender_for(&self, id: WorkerId) -> EventSender {
        self.senders
            .iter()
            .find(|(worker, _)| *worker == id)
            .map(|(_, tx)| tx.clone())
            .expect("no such worker")
    }
}

pub struct ScriptedSpawner {
    script: Script,
    journal: Arc<Mutex<Journal>>,
    fail_spawn: bool,
    fail_runs: bool,
}

impl ScriptedSpawner {
    pub fn new(
        script: impl Fn(&ControlMessage) -> Vec<WorkerEvent> + Send + Sync + 'static,
    ) -> (Self, Arc<Mutex<Journal>>) {
        let journal = Arc::new(Mutex::new(Journal::default()));
        (
            Self {
                script: Arc::new(script),
                journal: journal.clone(),
                fail_spawn: false,
                fail_runs: false,
            },
            journal,
        )
    }

    /// Answers warmup with `ready`; runs print their code back on stdout,
    /// except code containing `raise`, which reports a runtime error.
    pub fn echo() -> (Self, Arc<Mutex<Journal>>) {
        Self::new(|message| match message {
            ControlMessage::Warmup => vec![WorkerEvent::Ready],
            ControlMessage::Run { code } if code.contains("raise") => vec![
                WorkerEvent::Status {
                    phase: Phase::Running,
                },
                WorkerEvent::RuntimeError {
                    text: format!("Traceback: {}", code),
                },
                WorkerEvent::Done,
            ],
            ControlMessage::Run { code } => vec![
                WorkerEvent::Status {
                    phase: Phase::Running,
                },
                WorkerEvent::Stdout { text: code.clone() },
                WorkerEvent::Status {
                    phase: Phase::Success,
                },
                WorkerEvent::Done,
            ],
        })
    }

    /// Never answers; the test injects events through the journal.
    pub fn silent() -> (Self, Arc<Mutex<Journal>>) {
        Self::new(|_| Vec::new())
    }

    pub fn failing() -> (Self, Arc<Mutex<Journal>>) {
        let (mut spawner, journal) = Self::silent();
        spawner.fail_spawn = true;
        (spawner, journal)
    }

    /// Warms up normally, but the transport breaks whenever a run is sent.
    pub fn broken_pipe() -> (Self, Arc<Mutex<Journal>>) {
        let (mut spawner, journal) = Self::new(|message| match message {
            ControlMessage::Warmup => vec![WorkerEvent::Ready],
            ControlMessage::Run { .. } => Vec::new(),
        });
        spawner.fail_runs = true;
        (spawner, journal)
    }
}

impl WorkerSpawner for ScriptedSpawner {
    fn spawn(
        &mut self,
        id: WorkerId,
        events: EventSender,
    ) -> Result<Box<dyn Worker>, RuntimeError> {
        if self.fail_spawn {
            return Err(RuntimeError::Spawn("scripted spawn failure".to_string()));
        }
        let mut journal = self.journal.lock().unwrap();
        journal.spawned.push(id);
        journal.senders.push((id, events.clone()));
        Ok(Box::new(ScriptedWorker {
            id,
            events,
            script: self.script.clone(),
            journal: self.journal.clone(),
            fail_runs: self.fail_runs,
        }))
    }
}

struct ScriptedWorker {
    id: WorkerId,
    events: EventSender,
    script: Script,
    journal: Arc<Mutex<Journal>>,
    fail_runs: bool,
}

impl Worker for ScriptedWorker {
    fn send(&mut self, message: ControlMessage) -> Result<(), RuntimeError> {
        self.journal
            .lock()
            .unwrap()
            .sent
            .push((self.id, message.clone()));
        if self.fail_runs && matches!(message, ControlMessage::Run { .. }) {
            return Err(RuntimeError::Transport(format!("{} closed its input", self.id)));
        }
        for event in (self.script)(&message) {
            self.events
                .send(Envelope::event(self.id, event))
                .map_err(|e| RuntimeError::Transport(e.to_string()))?;
        }
        Ok(())
    }

    fn terminate(&mut self) {
        self.journal.lock().unwrap().terminated.push(self.id);
    }
}
