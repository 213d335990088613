//! Error taxonomy for the launch core.
//!
//! Resolution and activation failures are surfaced to the immediate caller
//! and never swallowed; only the top-level entry point decides whether a
//! failure terminates the process or is returned as a status code.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the launch core.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// No resolver plugin claimed the path and it does not exist on disk.
    #[error("script or file path is invalid: {}", path.display())]
    UnresolvableInput {
        /// The path that could not be resolved.
        path: PathBuf,
    },

    /// Cold-start construction of the host application or binding of the
    /// global concurrency-loop policy failed. Always fatal; no environment
    /// becomes current.
    #[error("cold-start initialization failed")]
    EnvironmentInitFailure {
        #[source]
        source: anyhow::Error,
    },

    /// Warm-reentry construction or activation of an execution environment
    /// failed. Fatal for that activation attempt; the prior environment is
    /// not resurrected.
    #[error("environment activation failed")]
    EnvironmentActivationFailure {
        #[source]
        source: anyhow::Error,
    },

    /// A `key=value` argument string lacks the `=` separator. This is a
    /// caller contract violation, not a recoverable runtime condition.
    #[error("argument is not of the form key=value: {arg:?}")]
    ArgumentParseViolation {
        /// The offending argument string.
        arg: String,
    },

    /// A resolver plugin could not be loaded from a shared library.
    #[error("failed to load resolver plugin from {}", path.display())]
    PluginLoad {
        /// Path to the shared library.
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// A plugin claimed a path but failed while resolving it.
    #[error("plugin '{namespace}' failed to resolve {}", path.display())]
    PluginResolve {
        /// Namespace identifier of the failing plugin.
        namespace: String,
        /// The path being resolved.
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}
