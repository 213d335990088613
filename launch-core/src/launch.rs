//! Launch Orchestration
//!
//! Ties the resolver chain and the lifecycle manager together: resolve the
//! user-supplied path, apply per-namespace launch policy, activate an
//! execution environment (cold or warm), hand the resolved script to the
//! consumer, and, in reentrant mode, dispose the environment before
//! returning the exit status instead of terminating the process.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::env::LifecycleManager;
use crate::error::LaunchError;
use crate::resolver::{resolve_script, PluginRegistry};
use crate::script::{coerce_arguments, ResolvedScript};

/// Options controlling a single launch.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Reentrant ("no-exit") mode: keep the process alive after the run,
    /// dispose the environment explicitly, and return exit codes to the
    /// caller instead of terminating.
    pub no_exit: bool,
    /// Do not change the working directory to the script's parent.
    pub preserve_cwd: bool,
    /// Plugin namespaces for which the working directory is always
    /// preserved, regardless of `preserve_cwd`.
    pub preserve_cwd_namespaces: Vec<String>,
    /// Frame to load initially, passed through to the consumer.
    pub initial_frame: Option<u64>,
    /// Extra `key=value` arguments merged over the script's own arguments.
    pub extra_args: Vec<String>,
}

/// Consumer of a fully-resolved script inside an active environment.
///
/// This is the boundary to the window/runner layer: the core's contract
/// ends at handing over the script and the active environment's identity.
pub trait ScriptConsumer {
    /// Load and run the script; returns the run's exit code.
    fn run(&mut self, script: &ResolvedScript, environment_id: u64, options: &LaunchOptions)
        -> i32;
}

/// Resolve `script_path`, activate an environment, and run the script.
///
/// Errors are surfaced to the caller; mapping them onto process exit is
/// the top-level entry point's decision (see [`exit_with`]). In reentrant
/// mode the environment is disposed before the exit code is returned.
pub fn launch(
    manager: &LifecycleManager,
    registry: &PluginRegistry,
    consumer: &mut dyn ScriptConsumer,
    script_path: &Path,
    options: &LaunchOptions,
) -> Result<i32, LaunchError> {
    let (script, plugin) = resolve_script(registry, script_path)?;

    let mut preserve_cwd = options.preserve_cwd;
    if let Some(plugin) = plugin {
        if options
            .preserve_cwd_namespaces
            .iter()
            .any(|ns| ns == plugin.namespace())
        {
            debug!(
                namespace = plugin.namespace(),
                "namespace policy forces working-directory preservation"
            );
            preserve_cwd = true;
        }
    }

    if !preserve_cwd {
        if let Some(parent) = script.path.parent() {
            if let Err(e) = std::env::set_current_dir(parent) {
                warn!(dir = %parent.display(), error = %e, "failed to change working directory");
            }
        }
    }

    // The resolved unit itself stays immutable; extra arguments are merged
    // into the copy handed to the consumer, later entries winning.
    let script = if options.extra_args.is_empty() {
        script
    } else {
        let mut arguments = script.arguments.clone();
        arguments.extend(coerce_arguments(&options.extra_args)?);
        script.with_arguments(arguments)
    };

    if manager.is_first_activation() {
        debug!("first activation in this process, taking cold-start path");
    }
    let environment_id = manager.activate()?;

    info!(
        script = %script.display_name,
        environment = environment_id,
        "handing script to consumer"
    );
    let code = consumer.run(&script, environment_id, options);

    if options.no_exit {
        manager.dispose_current();
    }

    Ok(code)
}

/// The core's exit protocol: terminate the process with `code`, or, in
/// reentrant mode, return it to the caller without terminating.
pub fn exit_with(code: i32, no_exit: bool) -> i32 {
    if no_exit {
        return code;
    }
    std::process::exit(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_with_reentrant_returns_code() {
        assert_eq!(exit_with(3, true), 3);
        assert_eq!(exit_with(0, true), 0);
    }

    #[test]
    fn test_default_options() {
        let options = LaunchOptions::default();
        assert!(!options.no_exit);
        assert!(!options.preserve_cwd);
        assert!(options.preserve_cwd_namespaces.is_empty());
        assert!(options.extra_args.is_empty());
    }
}
