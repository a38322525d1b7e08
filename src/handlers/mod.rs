//! Front-end entry points: the interactive pad and headless runs.

pub mod repl;
pub mod run;
