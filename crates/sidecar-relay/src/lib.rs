//! Supervised-process log relay.
//!
//! Print-style output goes through a [`Console`] whose channels can be
//! forwarded to a structured sink, and a [`Sidecar`] runs one bundled
//! program while relaying its output and exit through the same console.

#[cfg(not(unix))]
compile_error!("sidecar-relay currently supports Unix targets only");

mod factory;
mod logging;
mod resolver;
mod supervisor;

pub use factory::{PlatformProcessManager, PlatformProcessManagerFactory};
pub use logging::{LoggingConfig, TracingSink, init_tracing};
pub use resolver::{BundledResolver, ProgramResolver, SystemResolver};
pub use supervisor::{CommandOutput, Sidecar};

// Re-export core functionality
pub use sidecar_relay_core::*;
