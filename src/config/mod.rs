use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    time::Duration,
};

use directories::BaseDirs;

use crate::execution::output::DEFAULT_OUTPUT_LIMIT_BYTES;
use crate::execution::RuntimeSettings;
use crate::process::python::DEFAULT_BLOCKED_MODULES;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&default_config_path())
    }

    pub fn load_from(config_path: &Path) -> Self {
        let mut map = default_map();

        // Read .pypadrc if exists
        if config_path.exists() {
            match fs::File::open(config_path) {
                Ok(file) => {
                    let reader = BufReader::new(file);
                    for line in reader.lines().map_while(Result::ok) {
                        let line = line.trim();
                        if line.is_empty() || line.starts_with('#') {
                            continue;
                        }
                        if let Some((k, v)) = line.split_once('=') {
                            map.insert(k.trim().to_string(), v.trim().to_string());
                        }
                    }
                }
                Err(e) => log::warn!("cannot read {}: {}", config_path.display(), e),
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self {
            inner: map,
            config_path: config_path.to_path_buf(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.inner.insert(key.to_string(), value.into());
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }

    pub fn python_path(&self) -> PathBuf {
        self.get_path("PYTHON_PATH")
            .unwrap_or_else(|| PathBuf::from("python3"))
    }

    pub fn blocked_modules(&self) -> Vec<String> {
        match self.get("BLOCKED_MODULES") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_BLOCKED_MODULES.iter().map(|m| m.to_string()).collect(),
        }
    }

    pub fn log_level(&self) -> String {
        self.get("LOG_LEVEL").unwrap_or_else(|| "info".to_string())
    }

    pub fn log_file(&self) -> PathBuf {
        self.get_path("LOG_FILE")
            .unwrap_or_else(|| env::temp_dir().join("pypad").join("pypad.log"))
    }

    pub fn theme_state_path(&self) -> PathBuf {
        self.get_path("THEME_STATE_PATH")
            .unwrap_or_else(|| config_dir().join("theme"))
    }

    pub fn runtime_settings(&self) -> RuntimeSettings {
        let run_timeout = match self.get_usize("RUN_TIMEOUT") {
            Some(0) | None => None,
            Some(secs) => Some(Duration::from_secs(secs as u64)),
        };
        RuntimeSettings {
            output_limit_bytes: self
                .get_usize("OUTPUT_LIMIT_BYTES")
                .unwrap_or(DEFAULT_OUTPUT_LIMIT_BYTES),
            run_timeout,
        }
    }
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &[
        "PYTHON_PATH",
        "BLOCKED_MODULES",
        "OUTPUT_LIMIT_BYTES",
        "RUN_TIMEOUT",
        "LOG_LEVEL",
        "LOG_FILE",
        "THEME",
        "THEME_STATE_PATH",
    ];

    KEYS.contains(&k)
}

fn config_dir() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("pypad")
}

fn default_config_path() -> PathBuf {
    config_dir().join(".pypadrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    let temp = env::temp_dir().join("pypad");

    m.insert("PYTHON_PATH".into(), "python3".into());
    m.insert("BLOCKED_MODULES".into(), DEFAULT_BLOCKED_MODULES.join(","));
    m.insert(
        "OUTPUT_LIMIT_BYTES".into(),
        DEFAULT_OUTPUT_LIMIT_BYTES.to_string(),
    );
    m.insert("RUN_TIMEOUT".into(), "0".into());
    m.insert("LOG_LEVEL".into(), "info".into());
    m.insert(
        "LOG_FILE".into(),
        temp.join("pypad.log").to_string_lossy().into_owned(),
    );
    m.insert("THEME".into(), "dark".into());
    m.insert(
        "THEME_STATE_PATH".into(),
        config_dir().join("theme").to_string_lossy().into_owned(),
    );

    m
}
