//! Sidecar relay core - platform-independent model, log relay and process traits
//!
//! This crate provides the console dispatcher and log sink plumbing, the
//! configuration and error types, and the traits platform crates implement
//! to spawn and reap a supervised child.

pub mod config;
pub mod error;
pub mod event;
pub mod process;
pub mod relay;
pub mod stdio;

pub use config::*;
pub use error::*;
pub use event::*;
pub use process::*;
pub use relay::*;
