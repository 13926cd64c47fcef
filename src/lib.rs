//! full-autorest
//!
//! HTTP service that runs the AutoRest code generator on request and streams
//! its output back to the caller. Each request gets its own output directory,
//! a bounded run time and a reported outcome.
#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod generation;
pub mod infrastructure;
pub mod state;

pub use config::ServerConfig;
pub use state::AppState;
