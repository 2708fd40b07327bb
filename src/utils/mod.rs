//! Utility functions and helpers.

pub mod duration;
pub mod http;
pub mod log;
pub mod time;
