//! Headless mode: run one file and stream its output.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use is_terminal::IsTerminal;

use crate::config::Config;
use crate::execution::{ExecutionStatus, RuntimeManager, RuntimeNotice, SubmitOutcome};
use crate::printer::RecordPrinter;
use crate::process::python::PythonSpawner;
use crate::utils::files;

/// Returns `true` when the run finished successfully.
pub async fn run(cfg: &Config, path: &Path) -> Result<bool> {
    let file = files::import_file(path)
        .with_context(|| format!("cannot run '{}'", path.display()))?;

    let printer = RecordPrinter {
        color: std::io::stderr().is_terminal(),
    };
    let spawner = PythonSpawner::new(cfg.python_path(), cfg.blocked_modules());
    let (mut manager, mut inbox) =
        RuntimeManager::new(cfg.runtime_settings(), Box::new(spawner));
    let mut notices = manager.subscribe();

    log::info!("running {} headlessly", file.name);
    match manager.submit(&file.text) {
        Ok(SubmitOutcome::Rejected) => {
            manager.output().iter().for_each(|r| printer.print(r));
            return Ok(true);
        }
        Ok(_) => {}
        Err(e) => {
            log::error!("submit failed: {}", e);
            manager.output().iter().for_each(|r| printer.print(r));
            return Ok(false);
        }
    }

    let mut tick = tokio::time::interval(Duration::from_millis(200));
    loop {
        while let Ok(notice) = notices.try_recv() {
            match notice {
                RuntimeNotice::Output(record) => printer.print(&record),
                RuntimeNotice::RunFinished { status, elapsed } => {
                    drain_output(&printer, &mut notices);
                    printer.summary(status, elapsed);
                    return Ok(status == ExecutionStatus::Success);
                }
                RuntimeNotice::Status { label, .. } => log::debug!("status: {}", label),
                RuntimeNotice::OutputCleared => {}
            }
        }

        tokio::select! {
            Some(envelope) = inbox.recv() => manager.handle(envelope),
            _ = tick.tick() => {
                manager.check_deadline(Instant::now());
            }
        }
    }
}

fn drain_output(
    printer: &RecordPrinter,
    notices: &mut tokio::sync::mpsc::UnboundedReceiver<RuntimeNotice>,
) {
    while let Ok(notice) = notices.try_recv() {
        if let RuntimeNotice::Output(record) = notice {
            printer.print(&record);
        }
    }
}
