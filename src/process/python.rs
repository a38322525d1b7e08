//! Python interpreter process bootstrap and I/O glue.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{EventSender, Worker, WorkerId, WorkerSpawner};
use crate::errors::RuntimeError;
use crate::execution::protocol::{decode, encode, ControlMessage, Envelope, Inbound, ProtocolError};

/// Runs inside the child; speaks the NDJSON protocol and installs the gates.
const BOOTSTRAP: &str = include_str!("bootstrap.py");

pub const DEFAULT_BLOCKED_MODULES: &[&str] = &[
    "subprocess",
    "_posixsubprocess",
    "multiprocessing",
    "ctypes",
    "_ctypes",
    "pty",
    "_socket",
];

#[derive(Debug, Clone)]
pub struct PythonSpawner {
    python: PathBuf,
    blocked_modules: Vec<String>,
}

impl PythonSpawner {
    pub fn new(python: impl Into<PathBuf>, blocked_modules: Vec<String>) -> Self {
        Self {
            python: python.into(),
            blocked_modules,
        }
    }
}

impl WorkerSpawner for PythonSpawner {
    fn spawn(
        &mut self,
        id: WorkerId,
        events: EventSender,
    ) -> Result<Box<dyn Worker>, RuntimeError> {
        let denylist = serde_json::to_string(&self.blocked_modules)
            .map_err(|e| RuntimeError::Protocol(ProtocolError::Malformed(e)))?;

        let mut cmd = Command::new(&self.python);
        cmd.arg("-u") // unbuffered
            .arg("-I") // ignore PYTHON* env vars and user site-packages
            .arg("-c")
            .arg(BOOTSTRAP)
            .arg(denylist)
            .current_dir(std::env::temp_dir())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child: Child = cmd
            .spawn()
            .map_err(|e| RuntimeError::Spawn(format!("{}: {}", self.python.display(), e)))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RuntimeError::Spawn("no stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RuntimeError::Spawn("no stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RuntimeError::Spawn("no stderr".to_string()))?;

        log::info!("spawned {} (pid {:?})", id, child.id());

        let (tx, rx) = mpsc::unbounded_channel();
        let tasks = vec![
            tokio::spawn(write_loop(id, stdin, rx, events.clone())),
            tokio::spawn(read_loop(id, stdout, events)),
            tokio::spawn(forward_diagnostics(id, stderr)),
        ];

        Ok(Box::new(PythonWorker {
            id,
            child,
            tx,
            tasks,
            terminated: false,
        }))
    }
}

pub struct PythonWorker {
    id: WorkerId,
    child: Child,
    tx: mpsc::UnboundedSender<ControlMessage>,
    tasks: Vec<JoinHandle<()>>,
    terminated: bool,
}

impl Worker for PythonWorker {
    fn send(&mut self, message: ControlMessage) -> Result<(), RuntimeError> {
        self.tx
            .send(message)
            .map_err(|_| RuntimeError::Transport(format!("{} stopped accepting messages", self.id)))
    }

    fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        for task in &self.tasks {
            task.abort();
        }
        if let Err(e) = self.child.start_kill() {
            log::debug!("{} was already gone: {}", self.id, e);
        }
        log::info!("terminated {}", self.id);
    }
}

impl Drop for PythonWorker {
    fn drop(&mut self) {
        self.terminate();
    }
}

async fn write_loop(
    id: WorkerId,
    mut stdin: ChildStdin,
    mut rx: mpsc::UnboundedReceiver<ControlMessage>,
    events: EventSender,
) {
    while let Some(message) = rx.recv().await {
        let line = match encode(&message) {
            Ok(line) => line,
            Err(e) => {
                let _ = events.send(Envelope::fault(id, e.to_string()));
                return;
            }
        };
        let written = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.flush().await
        };
        if let Err(e) = written.await {
            let _ = events.send(Envelope::fault(id, format!("write to worker failed: {}", e)));
            return;
        }
    }
}

async fn read_loop(id: WorkerId, stdout: ChildStdout, events: EventSender) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let envelope = match lines.next_line().await {
            Ok(Some(line)) => match decode(&line) {
                Ok(event) => Envelope::event(id, event),
                Err(ProtocolError::Empty) => continue,
                Err(e) => Envelope::fault(id, e.to_string()),
            },
            Ok(None) => Envelope::fault(id, "worker process exited"),
            Err(e) => Envelope::fault(id, format!("read from worker failed: {}", e)),
        };
        let fatal = matches!(envelope.inbound, Inbound::Fault(_));
        if events.send(envelope).is_err() || fatal {
            return;
        }
    }
}

async fn forward_diagnostics(id: WorkerId, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        log::debug!("{} stderr: {}", id, line);
    }
}
