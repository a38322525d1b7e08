//! Light/dark theme and its persisted flag.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ratatui::style::Color;

use crate::execution::Channel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

pub struct Palette {
    pub fg: Color,
    pub bg: Color,
    pub border: Color,
    pub line_number: Color,
    pub status_fg: Color,
    pub status_bg: Color,
}

impl Theme {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(Theme::Dark),
            "light" => Some(Theme::Light),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    /// The stored flag wins over `fallback`; a missing or unreadable file does not.
    pub fn load(path: &Path, fallback: Theme) -> Theme {
        match fs::read_to_string(path) {
            Ok(value) => Theme::parse(&value).unwrap_or(fallback),
            Err(_) => fallback,
        }
    }

    pub fn save(self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        fs::write(path, self.name())
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(())
    }

    pub fn palette(self) -> Palette {
        match self {
            Theme::Dark => Palette {
                fg: Color::Gray,
                bg: Color::Reset,
                border: Color::DarkGray,
                line_number: Color::DarkGray,
                status_fg: Color::White,
                status_bg: Color::DarkGray,
            },
            Theme::Light => Palette {
                fg: Color::Black,
                bg: Color::White,
                border: Color::Gray,
                line_number: Color::Gray,
                status_fg: Color::Black,
                status_bg: Color::Gray,
            },
        }
    }

    pub fn channel_color(self, channel: Channel) -> Color {
        match (self, channel) {
            (Theme::Dark, Channel::Stdout) => Color::Gray,
            (Theme::Light, Channel::Stdout) => Color::Black,
            (_, Channel::Stderr) => Color::Yellow,
            (_, Channel::Error) => Color::Red,
            (Theme::Dark, Channel::Info) => Color::Cyan,
            (Theme::Light, Channel::Info) => Color::Blue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_flag_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("theme");
        assert_eq!(Theme::load(&path, Theme::Dark), Theme::Dark);

        Theme::Light.save(&path).unwrap();
        assert_eq!(Theme::load(&path, Theme::Dark), Theme::Light);
    }

    #[test]
    fn garbage_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("theme");
        fs::write(&path, "purple").unwrap();
        assert_eq!(Theme::load(&path, Theme::Light), Theme::Light);
        assert_eq!(Theme::parse(" Dark\n"), Some(Theme::Dark));
    }
}
