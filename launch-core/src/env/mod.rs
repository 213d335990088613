//! Environment Lifecycle Manager
//!
//! Provides exactly one "current" [`ExecutionEnvironment`] at a time and
//! handles the asymmetry between a process's first activation and all
//! subsequent ones:
//!
//! - **Cold start**: construct the host application, bind the process-wide
//!   concurrency-loop policy (once per process), create and activate the
//!   first environment.
//! - **Warm reentry**: create and activate a fresh environment without
//!   touching the global policy.
//! - **Dispose**: in reentrant ("no-exit") mode, shut the current
//!   environment down synchronously so the process can stay alive for the
//!   next activation.
//!
//! The three transitions are serialized under a single lock spanning the
//! initialized-flag check and the subsequent construction, so a
//! double cold-start cannot race even if the manager is shared across
//! threads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use anyhow::Context;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, info, warn};

use crate::error::LaunchError;

/// Process-wide concurrency-loop policy, bound at most once per process.
static LOOP_POLICY: OnceLock<Runtime> = OnceLock::new();

/// Monotonic environment identity counter.
static NEXT_ENVIRONMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Bind the process-wide concurrency-loop policy.
///
/// The policy runtime is built at most once per process; later cold starts
/// (e.g. a second manager within the same test binary) observe the existing
/// binding and return it unchanged.
fn bind_loop_policy() -> Result<&'static Handle, LaunchError> {
    if let Some(runtime) = LOOP_POLICY.get() {
        debug!("concurrency-loop policy already bound");
        return Ok(runtime.handle());
    }

    let runtime = Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("loop-policy")
        .enable_time()
        .build()
        .context("failed to build concurrency-loop policy runtime")
        .map_err(|source| LaunchError::EnvironmentInitFailure { source })?;

    info!("bound process-wide concurrency-loop policy");
    Ok(LOOP_POLICY.get_or_init(|| runtime).handle())
}

/// Returns `true` once the process-wide loop policy has been bound.
pub fn loop_policy_bound() -> bool {
    LOOP_POLICY.get().is_some()
}

/// Handle to the process-wide loop policy, if bound.
pub fn loop_policy() -> Option<&'static Handle> {
    LOOP_POLICY.get().map(Runtime::handle)
}

/// The host application object, constructed exactly once at cold start and
/// held by the manager for the life of the process.
#[derive(Debug)]
pub struct HostApplication {
    name: String,
    pid: u32,
}

impl HostApplication {
    fn construct(name: &str) -> Result<Self, LaunchError> {
        if name.is_empty() {
            return Err(LaunchError::EnvironmentInitFailure {
                source: anyhow::anyhow!("host application name must not be empty"),
            });
        }
        info!(name, "constructed host application");
        Ok(Self {
            name: name.to_string(),
            pid: std::process::id(),
        })
    }

    /// Host application name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Process id the host was constructed in.
    pub fn pid(&self) -> u32 {
        self.pid
    }
}

/// An isolated unit of process-wide execution context with its own
/// concurrency-loop binding.
///
/// Environments are created per activation and never reused; disposing one
/// shuts its runtime down synchronously.
pub struct ExecutionEnvironment {
    id: u64,
    runtime: Option<Runtime>,
}

impl ExecutionEnvironment {
    fn create() -> anyhow::Result<Self> {
        let id = NEXT_ENVIRONMENT_ID.fetch_add(1, Ordering::Relaxed);
        let runtime = Builder::new_current_thread()
            .enable_time()
            .build()
            .with_context(|| format!("failed to build runtime for environment {id}"))?;
        debug!(id, "created execution environment");
        Ok(Self {
            id,
            runtime: Some(runtime),
        })
    }

    /// Unique identity of this environment within the process.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Handle to this environment's own concurrency loop, until disposed.
    pub fn handle(&self) -> Option<Handle> {
        self.runtime.as_ref().map(|rt| rt.handle().clone())
    }

    /// Returns `true` after [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.runtime.is_none()
    }

    fn dispose(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(Duration::from_secs(1));
            debug!(id = self.id, "disposed execution environment");
        }
    }
}

/// Lifecycle phase of the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// No activation has occurred yet.
    Uninitialized,
    /// An environment is current.
    Active,
    /// The last environment was disposed (reentrant mode); a further
    /// activation takes the warm-reentry path.
    Disposed,
}

struct LifecycleInner {
    /// Set true exactly once, on the first activation in the process.
    initialized: bool,
    phase: LifecyclePhase,
    host: Option<HostApplication>,
    current: Option<ExecutionEnvironment>,
    activations: u64,
}

/// Process-wide lifecycle state and transition operations.
pub struct LifecycleManager {
    host_name: String,
    inner: Mutex<LifecycleInner>,
}

impl LifecycleManager {
    /// Create a manager in the `Uninitialized` phase.
    pub fn new(host_name: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            inner: Mutex::new(LifecycleInner {
                initialized: false,
                phase: LifecyclePhase::Uninitialized,
                host: None,
                current: None,
                activations: 0,
            }),
        }
    }

    /// Whether the next activation will take the cold-start path.
    ///
    /// Answerable before performing the transition; this is the guard that
    /// selects cold start vs warm reentry.
    pub fn is_first_activation(&self) -> bool {
        !self.lock().initialized
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> LifecyclePhase {
        self.lock().phase
    }

    /// Number of activations performed so far.
    pub fn activation_count(&self) -> u64 {
        self.lock().activations
    }

    /// Identity of the current environment, if one is active.
    pub fn current_environment_id(&self) -> Option<u64> {
        self.lock().current.as_ref().map(ExecutionEnvironment::id)
    }

    /// Run `f` against the current environment, if one is active.
    pub fn with_current<R>(&self, f: impl FnOnce(&ExecutionEnvironment) -> R) -> Option<R> {
        self.lock().current.as_ref().map(f)
    }

    /// Activate a fresh execution environment and make it current.
    ///
    /// The first call per manager takes the cold-start path: the host
    /// application is constructed and the process-wide loop policy bound.
    /// Every later call takes the warm-reentry path, which never touches
    /// the global policy. Returns the new environment's identity.
    ///
    /// On warm-reentry failure the prior environment, if any, stays
    /// current; it is not resurrected or replaced.
    pub fn activate(&self) -> Result<u64, LaunchError> {
        let mut inner = self.lock();

        if !inner.initialized {
            // Cold start. Any failure here is fatal: no environment may
            // become current and the caller must not proceed.
            info!(host = %self.host_name, "cold start");
            let host = HostApplication::construct(&self.host_name)?;
            bind_loop_policy()?;
            let environment = ExecutionEnvironment::create()
                .map_err(|source| LaunchError::EnvironmentInitFailure { source })?;
            let id = environment.id();

            inner.host = Some(host);
            inner.current = Some(environment);
            inner.initialized = true;
            inner.phase = LifecyclePhase::Active;
            inner.activations = 1;
            return Ok(id);
        }

        info!(activation = inner.activations + 1, "warm reentry");
        if let Some(previous) = &inner.current {
            // Superseding an undisposed environment is legal but, in
            // reentrant mode, the caller should have disposed it first.
            warn!(
                previous = previous.id(),
                "activating over an undisposed environment"
            );
        }

        let environment = ExecutionEnvironment::create()
            .map_err(|source| LaunchError::EnvironmentActivationFailure { source })?;
        let id = environment.id();

        inner.current = Some(environment);
        inner.phase = LifecyclePhase::Active;
        inner.activations += 1;
        Ok(id)
    }

    /// Dispose the current environment synchronously.
    ///
    /// Only meaningful in reentrant mode, where the process stays alive for
    /// a future activation. Returns the disposed environment's identity, or
    /// `None` when no environment was current.
    pub fn dispose_current(&self) -> Option<u64> {
        let mut inner = self.lock();
        match inner.current.take() {
            Some(mut environment) => {
                let id = environment.id();
                environment.dispose();
                inner.phase = LifecyclePhase::Disposed;
                info!(id, "current environment disposed");
                Some(id)
            }
            None => {
                warn!("dispose requested but no environment is current");
                None
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LifecycleInner> {
        self.inner.lock().expect("lifecycle lock poisoned")
    }
}
