//! Code pad TUI using Ratatui.

pub mod app;
pub mod editor;
pub mod events;
pub mod handler;
pub mod theme;
pub mod ui;

pub use handler::run_code_pad;
