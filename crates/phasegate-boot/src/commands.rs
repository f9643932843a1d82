//! Subcommand bodies. Each returns what to print and the exit code, so the
//! binary stays a thin shell around them.

use crate::demo::{build_orchestrator, demo_registrations, DemoOptions};
use anyhow::Context;
use phasegate_auth::{render_summary, validate_auth_at_startup, AuthConfigValidator, AuthPolicy};
use phasegate_config::{CachedProvider, ConfigProvider, LayeredProvider, MapProvider, ProcessEnvProvider};
use phasegate_core::{InitializationPhase, ShutdownReport};
use std::path::Path;
use std::sync::Arc;

/// Critical auth configuration failure
pub const EXIT_AUTH_INVALID: i32 = 1;
/// A critical service failed to become ready
pub const EXIT_BOOT_FAILED: i32 = 2;

const CONFIG_CACHE_CAPACITY: u64 = 256;

/// Text for stdout plus the process exit code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub exit_code: i32,
}

impl CommandOutput {
    fn new(stdout: String, exit_code: i32) -> Self {
        Self { stdout, exit_code }
    }
}

/// Process environment over an optional flat TOML file, cached per key
pub fn config_provider(config_file: Option<&Path>) -> anyhow::Result<Arc<dyn ConfigProvider>> {
    let mut layers = LayeredProvider::new().with_layer(Arc::new(ProcessEnvProvider::new()));
    if let Some(path) = config_file {
        let file = MapProvider::from_toml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;
        tracing::debug!(path = %path.display(), keys = file.len(), "configuration file loaded");
        layers = layers.with_layer(Arc::new(file));
    }
    Ok(Arc::new(CachedProvider::new(layers, CONFIG_CACHE_CAPACITY)))
}

/// Default policy, or the one in `path`
pub fn load_policy(path: Option<&Path>) -> anyhow::Result<AuthPolicy> {
    match path {
        None => Ok(AuthPolicy::default()),
        Some(path) => AuthPolicy::from_toml_file(path)
            .with_context(|| format!("failed to load auth policy from {}", path.display())),
    }
}

/// `validate-auth`: every check, one summary, non-zero on a critical failure
pub fn validate_auth(
    config: Arc<dyn ConfigProvider>,
    policy: AuthPolicy,
    json: bool,
) -> anyhow::Result<CommandOutput> {
    let report = AuthConfigValidator::new(config).with_policy(policy).validate_all();
    let stdout = if json {
        serde_json::to_string_pretty(&report)?
    } else {
        render_summary(&report)
    };
    let exit_code = if report.success { 0 } else { EXIT_AUTH_INVALID };
    Ok(CommandOutput::new(stdout, exit_code))
}

/// `boot`: auth pre-flight, then the demo graph, then shutdown
pub async fn boot(
    config: Arc<dyn ConfigProvider>,
    options: DemoOptions,
    json: bool,
) -> anyhow::Result<CommandOutput> {
    let validator = AuthConfigValidator::new(Arc::clone(&config)).with_policy(options.policy.clone());
    if let Err(err) = validate_auth_at_startup(&validator) {
        return Ok(CommandOutput::new(format!("{err}\n"), EXIT_AUTH_INVALID));
    }

    let orchestrator = build_orchestrator(config, &options)?;
    let startup = orchestrator.initialize_all().await?;
    let shutdown = orchestrator.shutdown().await;

    let stdout = if json {
        serde_json::to_string_pretty(&serde_json::json!({
            "startup": startup,
            "shutdown": shutdown,
        }))?
    } else {
        format!("{}\n{}", startup.generate_text(), render_shutdown(&shutdown))
    };
    let exit_code = if startup.success { 0 } else { EXIT_BOOT_FAILED };
    Ok(CommandOutput::new(stdout, exit_code))
}

/// `phases`: boot order with the demo services of each phase
pub fn phases() -> CommandOutput {
    let registrations = demo_registrations(&DemoOptions::default(), Arc::new(MapProvider::new()));

    let mut out = String::new();
    for phase in InitializationPhase::ALL {
        let services: Vec<&str> = registrations
            .iter()
            .filter(|r| r.phase == phase)
            .map(|r| r.name.as_str())
            .collect();
        out.push_str(&format!("{}. {phase}", phase.ordinal() + 1));
        if !services.is_empty() {
            out.push_str(&format!(": {}", services.join(", ")));
        }
        out.push('\n');
    }
    CommandOutput::new(out, 0)
}

fn render_shutdown(report: &ShutdownReport) -> String {
    let mut out = format!(
        "Shutdown: {} service(s) stopped in {}ms\n",
        report.stopped.len(),
        report.duration_ms
    );
    for failure in &report.failures {
        out.push_str(&format!("  teardown of {} failed: {}\n", failure.service, failure.message));
    }
    out
}
