//! Shared types for the VoiceHub schedule ticker.
//!
//! Everything here is free of network I/O: the feed model, day selection,
//! text formatting, the display contract and the config file.

pub mod config;
pub mod platform;
pub mod presenter;
pub mod schedule;
pub mod selector;
pub mod state;
