//! Utilities (file gating, unicode-aware cursor math).

pub mod files;
pub mod unicode;
