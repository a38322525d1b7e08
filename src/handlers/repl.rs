//! Interactive code pad.

use std::path::Path;

use anyhow::{bail, Result};
use is_terminal::IsTerminal;
use std::io;

use crate::config::Config;
use crate::execution::RuntimeManager;
use crate::process::python::PythonSpawner;
use crate::tui::{app::App, run_code_pad, theme::Theme};
use crate::utils::files;

/// Open the pad on `file`, or on a greeting when no file is given.
pub async fn run(cfg: &Config, file: Option<&Path>) -> Result<()> {
    if !io::stdout().is_terminal() {
        eprintln!("The code pad needs a terminal. Use `pypad run FILE` for redirected output.");
        bail!("TUI mode requires a proper terminal environment");
    }

    let (text, path) = match file {
        Some(path) if path.exists() => (files::import_file(path)?.text, Some(path.to_path_buf())),
        // A new file: start empty and save to this path.
        Some(path) => (String::new(), Some(path.to_path_buf())),
        None => (default_example(), None),
    };

    let fallback = cfg
        .get("THEME")
        .and_then(|t| Theme::parse(&t))
        .unwrap_or_default();
    let theme_path = cfg.theme_state_path();
    let theme = Theme::load(&theme_path, fallback);

    let spawner = PythonSpawner::new(cfg.python_path(), cfg.blocked_modules());
    let (manager, inbox) = RuntimeManager::new(cfg.runtime_settings(), Box::new(spawner));
    let app = App::new(&text, path, theme, theme_path);

    run_code_pad(app, manager, inbox).await
}

fn default_example() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "world".to_string());
    format!("print(\"Hello, {}!\")\n", user)
}
