//! Tinylinker - A tiny-code URL shortener
//!
//! Long URLs are hashed (MD5) and a fixed-width window over the encoded
//! digest becomes the code; collisions slide the window. Lookups go cache
//! first, then the store, and every successful lookup postpones expiry.
//!
//! # Architecture
//! - `shortcode`: hashing and collision-free code allocation
//! - `storage`: durable mappings with inactivity expiry
//! - `cache`: best-effort code → URL mirror (memory / Redis / none)
//! - `services`: Shorten / Resolve orchestration and background writes
//! - `api`: HTTP services
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Logging

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod shortcode;
pub mod storage;
pub mod system;
