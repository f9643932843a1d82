//! phasegate auth - authentication configuration validation
//!
//! Checks the auth-related configuration of a deployment before it serves
//! traffic:
//! - One independent check per [`AuthComponent`], each producing exactly one
//!   primary [`AuthValidationResult`]
//! - Criticality and thresholds depend on the [`Environment`](phasegate_config::Environment)
//! - Thresholds and the placeholder deny-list come from [`AuthPolicy`]
//! - [`validate_auth_at_startup`] logs one consolidated summary and fails
//!   with an [`AuthValidationError`] naming every critical finding
//! - [`auth_service_registration`] plugs the validator into the boot graph
//!
//! # Example
//!
//! ```rust,ignore
//! use phasegate_auth::{validate_auth_at_startup, AuthConfigValidator};
//! use phasegate_config::ProcessEnvProvider;
//! use std::sync::Arc;
//!
//! let validator = AuthConfigValidator::new(Arc::new(ProcessEnvProvider::new()));
//! if let Err(err) = validate_auth_at_startup(&validator) {
//!     eprintln!("{err}");
//!     std::process::exit(1);
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod component;
pub mod error;
pub mod keys;
pub mod policy;
pub mod registration;
pub mod result;
pub mod secrets;
pub mod startup;
pub mod validator;

pub use component::{AuthComponent, ValidationPass};
pub use error::{AuthValidationError, CriticalFinding};
pub use policy::{AuthPolicy, Bounds, BoundsCheck};
pub use registration::{
    auth_service_registration, published_report, AuthInitializer, AuthReadiness,
    AUTH_SERVICE_NAME,
};
pub use result::{AuthValidationReport, AuthValidationResult};
pub use secrets::{assess_secret, SecretIssue, SecretProfile};
pub use startup::{render_summary, validate_auth_at_startup, AuthValidationSummary};
pub use validator::AuthConfigValidator;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
