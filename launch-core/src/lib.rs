//! Launch Core - Script Resolution and Environment Lifecycle
//!
//! This crate implements the launch path of a script preview host: a
//! user-supplied file path is resolved to an executable script unit via an
//! ordered chain of resolver plugins, and a process-wide lifecycle manager
//! provides exactly one active execution environment at a time, handling
//! the asymmetry between the first activation (cold start, one-time global
//! policy binding) and every later one (warm reentry with deterministic
//! disposal in no-exit mode).
//!
//! Rendering, script execution semantics, and plugin package management
//! are external collaborators; this crate's contract ends at handing a
//! fully-resolved script to a [`ScriptConsumer`] inside an active
//! environment.

pub mod env;
pub mod error;
pub mod launch;
pub mod resolver;
pub mod script;

pub use env::{
    loop_policy, loop_policy_bound, ExecutionEnvironment, HostApplication, LifecycleManager,
    LifecyclePhase,
};
pub use error::LaunchError;
pub use launch::{exit_with, launch, LaunchOptions, ScriptConsumer};
pub use resolver::{resolve_script, PluginRegistry, ResolverPlugin};
pub use script::{coerce_arguments, ArgValue, ResolvedScript};

use anyhow::Result;
use tracing::info;

/// Initialize logging for the launch host.
///
/// Respects `RUST_LOG` via the env-filter, defaulting to `info`.
pub fn init() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))?;

    info!("initializing launch core v{}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
