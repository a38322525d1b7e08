//! Async event loop for the code pad.

use std::io;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossterm::event::{
    DisableBracketedPaste, EnableBracketedPaste, KeyCode, KeyEvent, KeyModifiers,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;

use super::{
    app::{App, PromptKind},
    events::{spawn_input_reader, TuiEvent},
    ui::render_ui,
};
use crate::errors::RuntimeError;
use crate::execution::RuntimeManager;
use crate::process::Inbox;

/// Run the code pad until the user quits.
pub async fn run_code_pad(mut app: App, mut manager: RuntimeManager, inbox: Inbox) -> Result<()> {
    if !io::IsTerminal::is_terminal(&io::stdout()) {
        return Err(anyhow!("the code pad requires a proper terminal environment"));
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, &mut manager, inbox).await;

    disable_raw_mode()?;
    terminal.backend_mut().execute(DisableBracketedPaste)?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Main application loop
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    manager: &mut RuntimeManager,
    mut inbox: Inbox,
) -> Result<()> {
    let mut notices = manager.subscribe();
    let mut input = spawn_input_reader();
    let mut tick = tokio::time::interval(Duration::from_millis(250));

    if let Err(e) = manager.warmup() {
        log::error!("warm-up failed: {}", e);
    }

    loop {
        while let Ok(notice) = notices.try_recv() {
            app.apply_notice(notice);
        }
        terminal.draw(|frame| render_ui(frame, app))?;

        tokio::select! {
            Some(envelope) = inbox.recv() => {
                manager.handle(envelope);
                manager.pump(&mut inbox);
            }
            event = input.recv() => match event {
                Some(TuiEvent::Key(key)) => {
                    // Keys act on the status as the runtime last reported it.
                    while let Ok(notice) = notices.try_recv() {
                        app.apply_notice(notice);
                    }
                    if handle_key_event(app, manager, key) {
                        break;
                    }
                }
                Some(TuiEvent::Paste(text)) => {
                    if let Some(prompt) = app.prompt.as_mut() {
                        prompt.input.push_str(text.trim_end_matches(['\r', '\n']));
                    } else {
                        app.editor.insert_str(&text);
                    }
                }
                Some(TuiEvent::Resize) => {}
                None => return Err(anyhow!("terminal input closed")),
            },
            _ = tick.tick() => {
                manager.check_deadline(Instant::now());
            }
        }
    }

    Ok(())
}

/// Handle keyboard events. Returns `true` when the user asked to quit.
pub fn handle_key_event(app: &mut App, manager: &mut RuntimeManager, key: KeyEvent) -> bool {
    if app.prompt.is_some() {
        handle_prompt_key(app, key);
        return false;
    }
    // Any key closes the help overlay
    if app.show_help {
        app.toggle_help();
        return false;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('q') if ctrl => return true,
        KeyCode::F(5) => run_editor(app, manager),
        KeyCode::Char('r') if ctrl => run_editor(app, manager),
        KeyCode::F(6) => stop_run(app, manager),
        KeyCode::Char('x') if ctrl => stop_run(app, manager),
        KeyCode::Char('o') if ctrl => app.open_prompt(PromptKind::Open),
        KeyCode::Char('s') if ctrl => app.open_prompt(PromptKind::Save),
        KeyCode::F(2) => app.toggle_theme(),
        KeyCode::F(1) => app.toggle_help(),
        KeyCode::PageUp => app.scroll_up(),
        KeyCode::PageDown => app.scroll_down(),
        KeyCode::Enter => app.editor.insert_newline(),
        KeyCode::Tab => app.editor.insert_tab(),
        KeyCode::Backspace => app.editor.backspace(),
        KeyCode::Delete => app.editor.delete(),
        KeyCode::Left => app.editor.move_left(),
        KeyCode::Right => app.editor.move_right(),
        KeyCode::Up => app.editor.move_up(),
        KeyCode::Down => app.editor.move_down(),
        KeyCode::Home => app.editor.move_home(),
        KeyCode::End => app.editor.move_end(),
        KeyCode::Char(c) if !ctrl => app.editor.insert_char(c),
        _ => {}
    }
    false
}

fn handle_prompt_key(app: &mut App, key: KeyEvent) {
    let Some(prompt) = app.prompt.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc => app.prompt = None,
        KeyCode::Enter => app.confirm_prompt(),
        KeyCode::Backspace => {
            prompt.input.pop();
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            prompt.input.push(c)
        }
        _ => {}
    }
}

// The run trigger is disabled while a run is in flight.
fn run_editor(app: &mut App, manager: &mut RuntimeManager) {
    if !app.status.can_run() {
        return;
    }
    match manager.submit(&app.editor.text()) {
        Ok(outcome) => log::debug!("submit: {:?}", outcome),
        Err(RuntimeError::RunInFlight) => {}
        // Already reported through the output pane.
        Err(e) => log::error!("submit failed: {}", e),
    }
}

fn stop_run(app: &mut App, manager: &mut RuntimeManager) {
    if app.status.can_stop() && manager.has_run_in_flight() {
        manager.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{ExecutionStatus, RuntimeSettings};
    use crate::process::scripted::ScriptedSpawner;
    use crate::process::WorkerId;
    use crate::tui::theme::Theme;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn sync(app: &mut App, notices: &mut tokio::sync::mpsc::UnboundedReceiver<crate::execution::RuntimeNotice>) {
        while let Ok(notice) = notices.try_recv() {
            app.apply_notice(notice);
        }
    }

    #[test]
    fn run_key_submits_editor_text() {
        let dir = tempfile::tempdir().unwrap();
        let (spawner, journal) = ScriptedSpawner::echo();
        let (mut manager, mut inbox) =
            RuntimeManager::new(RuntimeSettings::default(), Box::new(spawner));
        let mut notices = manager.subscribe();
        let mut app = App::new("hello", None, Theme::Dark, dir.path().join("theme"));

        assert!(!handle_key_event(&mut app, &mut manager, key(KeyCode::F(5))));
        manager.pump(&mut inbox);
        sync(&mut app, &mut notices);

        assert_eq!(app.status, ExecutionStatus::Success);
        assert_eq!(app.output.last().unwrap().text, "hello");
        assert_eq!(journal.lock().unwrap().runs_sent(), 1);
    }

    #[test]
    fn run_is_ignored_and_stop_works_only_while_running() {
        let dir = tempfile::tempdir().unwrap();
        let (spawner, journal) = ScriptedSpawner::silent();
        let (mut manager, mut inbox) =
            RuntimeManager::new(RuntimeSettings::default(), Box::new(spawner));
        let mut notices = manager.subscribe();
        let mut app = App::new("while True: pass", None, Theme::Dark, dir.path().join("theme"));

        manager.warmup().unwrap();
        handle_key_event(&mut app, &mut manager, ctrl('x'));
        assert_eq!(journal.lock().unwrap().terminated.len(), 0);

        let tx = journal.lock().unwrap().sender_for(WorkerId(1));
        tx.send(crate::execution::protocol::Envelope::event(
            WorkerId(1),
            crate::execution::protocol::WorkerEvent::Ready,
        ))
        .unwrap();
        manager.pump(&mut inbox);
        handle_key_event(&mut app, &mut manager, ctrl('r'));
        sync(&mut app, &mut notices);
        assert_eq!(app.status, ExecutionStatus::Running);

        handle_key_event(&mut app, &mut manager, key(KeyCode::F(5)));
        assert_eq!(journal.lock().unwrap().runs_sent(), 1);

        handle_key_event(&mut app, &mut manager, key(KeyCode::F(6)));
        sync(&mut app, &mut notices);
        assert_eq!(app.status, ExecutionStatus::Loading);
        assert_eq!(journal.lock().unwrap().terminated, vec![WorkerId(1)]);
    }

    #[test]
    fn typing_edits_the_buffer_and_ctrl_q_quits() {
        let dir = tempfile::tempdir().unwrap();
        let (spawner, _journal) = ScriptedSpawner::silent();
        let (mut manager, _inbox) =
            RuntimeManager::new(RuntimeSettings::default(), Box::new(spawner));
        let mut app = App::new("", None, Theme::Dark, dir.path().join("theme"));

        for c in "x=1".chars() {
            handle_key_event(&mut app, &mut manager, key(KeyCode::Char(c)));
        }
        assert_eq!(app.editor.text(), "x=1");
        assert!(handle_key_event(&mut app, &mut manager, ctrl('q')));
    }

    #[test]
    fn prompt_captures_keys_until_escape() {
        let dir = tempfile::tempdir().unwrap();
        let (spawner, _journal) = ScriptedSpawner::silent();
        let (mut manager, _inbox) =
            RuntimeManager::new(RuntimeSettings::default(), Box::new(spawner));
        let mut app = App::new("", None, Theme::Dark, dir.path().join("theme"));

        handle_key_event(&mut app, &mut manager, ctrl('o'));
        handle_key_event(&mut app, &mut manager, key(KeyCode::Char('a')));
        assert_eq!(app.prompt.as_ref().unwrap().input, "a");
        assert_eq!(app.editor.text(), "");
        handle_key_event(&mut app, &mut manager, key(KeyCode::Esc));
        assert!(app.prompt.is_none());
    }
}
