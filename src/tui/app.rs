//! TUI application state management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::editor::Editor;
use super::theme::Theme;
use crate::execution::{Channel, ExecutionStatus, OutputRecord, RuntimeNotice};
use crate::utils::files::{self, DEFAULT_FILE_NAME};

/// Which path prompt is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Open,
    Save,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrompt {
    pub kind: PromptKind,
    pub input: String,
}

/// Application state for the TUI
#[derive(Debug)]
pub struct App {
    pub editor: Editor,
    /// Output of the current run, mirrored from runtime notices
    pub output: Vec<OutputRecord>,
    /// Mirrored from the runtime; the UI never sets it directly
    pub status: ExecutionStatus,
    pub status_label: &'static str,
    /// Duration of the last finished run
    pub last_elapsed: Option<Duration>,
    /// Path the buffer was opened from or last saved to
    pub file: Option<PathBuf>,
    pub theme: Theme,
    pub theme_path: PathBuf,
    pub show_help: bool,
    pub prompt: Option<PathPrompt>,
    /// Lines scrolled up from the bottom of the output pane
    pub output_scroll_offset: usize,
}

impl App {
    pub fn new(text: &str, file: Option<PathBuf>, theme: Theme, theme_path: PathBuf) -> Self {
        let status = ExecutionStatus::default();
        Self {
            editor: Editor::from_text(text),
            output: Vec::new(),
            status,
            status_label: status.label(),
            last_elapsed: None,
            file,
            theme,
            theme_path,
            show_help: false,
            prompt: None,
            output_scroll_offset: 0,
        }
    }

    pub fn apply_notice(&mut self, notice: RuntimeNotice) {
        match notice {
            RuntimeNotice::Status { status, label } => {
                self.status = status;
                self.status_label = label;
            }
            RuntimeNotice::Output(record) => {
                self.output.push(record);
                self.scroll_to_bottom();
            }
            RuntimeNotice::OutputCleared => {
                self.output.clear();
                self.scroll_to_bottom();
            }
            RuntimeNotice::RunFinished { elapsed, .. } => self.last_elapsed = Some(elapsed),
        }
    }

    /// Messages that never reach the runtime, such as file rejections.
    pub fn info(&mut self, text: impl Into<String>) {
        self.output.push(OutputRecord::new(Channel::Info, text));
        self.scroll_to_bottom();
    }

    pub fn file_name(&self) -> String {
        self.file
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string())
    }

    pub fn open_prompt(&mut self, kind: PromptKind) {
        let input = match (kind, &self.file) {
            (_, Some(path)) => path.display().to_string(),
            (PromptKind::Save, None) => DEFAULT_FILE_NAME.to_string(),
            (PromptKind::Open, None) => String::new(),
        };
        self.prompt = Some(PathPrompt { kind, input });
    }

    /// Apply the open prompt, if any, to the file system.
    pub fn confirm_prompt(&mut self) {
        let Some(prompt) = self.prompt.take() else {
            return;
        };
        let path = PathBuf::from(prompt.input.trim());
        if path.as_os_str().is_empty() {
            return;
        }
        match prompt.kind {
            PromptKind::Open => self.open_file(&path),
            PromptKind::Save => self.save_file(&path),
        }
    }

    pub fn open_file(&mut self, path: &Path) {
        match files::import_file(path) {
            Ok(file) => {
                self.editor.set_text(&file.text);
                self.file = Some(path.to_path_buf());
                self.info(format!("Opened {}", file.name));
            }
            Err(e) => self.info(format!("Could not open {}: {}", path.display(), e)),
        }
    }

    pub fn save_file(&mut self, path: &Path) {
        match files::export_file(path, &self.editor.text()) {
            Ok(()) => {
                self.file = Some(path.to_path_buf());
                self.info(format!("Saved {}", path.display()));
            }
            Err(e) => self.info(format!("Could not save {}: {}", path.display(), e)),
        }
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        if let Err(e) = self.theme.save(&self.theme_path) {
            log::warn!("theme not persisted: {:#}", e);
            self.info(format!("Theme could not be saved: {:#}", e));
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn scroll_up(&mut self) {
        self.output_scroll_offset += 1;
    }

    pub fn scroll_down(&mut self) {
        self.output_scroll_offset = self.output_scroll_offset.saturating_sub(1);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.output_scroll_offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn app_in(dir: &Path) -> App {
        App::new("print('x')", None, Theme::Dark, dir.join("theme"))
    }

    #[test]
    fn notices_drive_status_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path());
        app.info("stale");
        app.apply_notice(RuntimeNotice::OutputCleared);
        app.apply_notice(RuntimeNotice::Status {
            status: ExecutionStatus::Running,
            label: ExecutionStatus::Running.label(),
        });
        app.apply_notice(RuntimeNotice::Output(OutputRecord::new(Channel::Stdout, "x")));

        assert_eq!(app.status, ExecutionStatus::Running);
        assert_eq!(app.status_label, "Running...");
        assert_eq!(app.output, vec![OutputRecord::new(Channel::Stdout, "x")]);
    }

    #[test]
    fn rejected_open_is_informational() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.md");
        fs::write(&notes, "# hi").unwrap();
        let mut app = app_in(dir.path());

        app.open_file(&notes);
        assert_eq!(app.editor.text(), "print('x')");
        assert_eq!(app.status, ExecutionStatus::Idle);
        assert_eq!(app.output.len(), 1);
        assert_eq!(app.output[0].channel, Channel::Info);
    }

    #[test]
    fn save_prompt_defaults_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path());
        app.open_prompt(PromptKind::Save);
        assert_eq!(app.prompt.as_ref().unwrap().input, DEFAULT_FILE_NAME);

        let target = dir.path().join("out.py");
        app.prompt.as_mut().unwrap().input = target.display().to_string();
        app.confirm_prompt();
        assert!(app.prompt.is_none());
        assert_eq!(fs::read_to_string(&target).unwrap(), "print('x')");
        assert_eq!(app.file_name(), "out.py");
    }

    #[test]
    fn theme_toggle_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path());
        app.toggle_theme();
        assert_eq!(app.theme, Theme::Light);
        assert_eq!(Theme::load(&dir.path().join("theme"), Theme::Dark), Theme::Light);
    }
}
