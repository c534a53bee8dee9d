//! Command handlers.

pub mod config;
pub mod keys;
pub mod misc;
pub mod notes;
