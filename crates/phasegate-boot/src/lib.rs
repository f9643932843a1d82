//! phasegate boot - demo service graph and command-line entry point
//!
//! - [`demo`]: simulated database, cache, agent runtime and WebSocket gateway
//!   around the real auth validator
//! - [`commands`]: `validate-auth`, `boot` and `phases`
//! - [`logging`]: tracing subscriber setup

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod commands;
pub mod demo;
pub mod logging;

pub use commands::{CommandOutput, EXIT_AUTH_INVALID, EXIT_BOOT_FAILED};
pub use demo::{build_orchestrator, demo_registrations, DemoOptions, DEMO_SERVICES};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
