// src/lib.rs

//! subsync library: incremental subscription to playlist sync

pub mod client;
pub mod error;
pub mod filter;
pub mod models;
pub mod pipeline;
pub mod storage;
pub mod utils;
