//! Resolver Chain - Path-to-Script Resolution
//!
//! Maps an arbitrary filesystem path to a [`ResolvedScript`] by delegating
//! to the first installed plugin that claims it. Registration order is the
//! priority order: this is a first-match chain, not a voting system, and
//! the chain is never re-sorted.
//!
//! If no plugin claims the path, the fallback branch checks that the path
//! exists on disk and, if so, treats it as a directly-executable script.

pub mod registry;

use std::path::Path;

use tracing::{debug, error};

pub use registry::PluginRegistry;

use crate::error::LaunchError;
use crate::script::ResolvedScript;

/// A capability provider that claims and interprets filesystem paths.
///
/// `resolve` is only ever invoked on a path for which `can_handle` returned
/// true on the same plugin instance, and must not perform execution during
/// resolution — only inspection and metadata parsing.
pub trait ResolverPlugin: Send + Sync {
    /// Stable namespace identifier (e.g. `"dev.example.source_load"`),
    /// used by callers to apply plugin-specific launch policy.
    fn namespace(&self) -> &str;

    /// Whether this plugin claims the given path.
    fn can_handle(&self, path: &Path) -> bool;

    /// Interpret a claimed path into an executable script unit.
    fn resolve(&self, path: &Path) -> Result<ResolvedScript, LaunchError>;
}

/// Resolve `path` against the installed plugin chain.
///
/// Returns the resolved script paired with the claiming plugin, or `None`
/// for the plugin when the default fallback was taken. A path that no
/// plugin claims and that does not exist on disk is a fatal user-input
/// error ([`LaunchError::UnresolvableInput`]); the caller decides whether
/// that terminates the process or is returned as a status.
pub fn resolve_script<'a>(
    registry: &'a PluginRegistry,
    path: &Path,
) -> Result<(ResolvedScript, Option<&'a dyn ResolverPlugin>), LaunchError> {
    for plugin in registry.iter() {
        if plugin.can_handle(path) {
            debug!(
                namespace = plugin.namespace(),
                path = %path.display(),
                "plugin claimed path"
            );
            let script = plugin.resolve(path)?;
            return Ok((script, Some(plugin)));
        }
    }

    if !path.exists() {
        error!(path = %path.display(), "script or file path is invalid");
        return Err(LaunchError::UnresolvableInput {
            path: path.to_path_buf(),
        });
    }

    debug!(path = %path.display(), "no plugin claimed path, using direct script fallback");
    Ok((ResolvedScript::direct(path, registry.default_reload()), None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Test plugin claiming paths with a fixed extension.
    struct ExtensionPlugin {
        namespace: &'static str,
        extension: &'static str,
    }

    impl ResolverPlugin for ExtensionPlugin {
        fn namespace(&self) -> &str {
            self.namespace
        }

        fn can_handle(&self, path: &Path) -> bool {
            path.extension().is_some_and(|ext| ext == self.extension)
        }

        fn resolve(&self, path: &Path) -> Result<ResolvedScript, LaunchError> {
            Ok(ResolvedScript::new(path).with_display_name(self.namespace))
        }
    }

    #[test]
    fn test_first_match_wins() {
        let mut registry = PluginRegistry::new();
        registry.register(Box::new(ExtensionPlugin {
            namespace: "test.first",
            extension: "vpy",
        }));
        registry.register(Box::new(ExtensionPlugin {
            namespace: "test.second",
            extension: "vpy",
        }));

        let (script, plugin) = resolve_script(&registry, Path::new("/x/clip.vpy")).unwrap();
        assert_eq!(plugin.unwrap().namespace(), "test.first");
        assert_eq!(script.display_name, "test.first");
    }

    #[test]
    fn test_later_plugin_claims_when_earlier_declines() {
        let mut registry = PluginRegistry::new();
        registry.register(Box::new(ExtensionPlugin {
            namespace: "test.vpy",
            extension: "vpy",
        }));
        registry.register(Box::new(ExtensionPlugin {
            namespace: "test.mkv",
            extension: "mkv",
        }));

        let (_, plugin) = resolve_script(&registry, Path::new("/x/clip.mkv")).unwrap();
        assert_eq!(plugin.unwrap().namespace(), "test.mkv");
    }

    #[test]
    fn test_fallback_for_existing_unclaimed_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# script").unwrap();

        let registry = PluginRegistry::new();
        let (script, plugin) = resolve_script(&registry, file.path()).unwrap();
        assert!(plugin.is_none());
        assert_eq!(script.display_name, file.path().display().to_string());
        assert!(script.arguments.is_empty());
    }

    #[test]
    fn test_fallback_default_reload_policy() {
        let file = tempfile::NamedTempFile::new().unwrap();

        let mut registry = PluginRegistry::new();
        registry.set_default_reload(false);
        let (script, _) = resolve_script(&registry, file.path()).unwrap();
        assert!(!script.reload_enabled);
    }

    #[test]
    fn test_missing_unclaimed_path_is_unresolvable() {
        let registry = PluginRegistry::new();
        let err = resolve_script(&registry, Path::new("/tmp/missing.vpy"))
            .err()
            .unwrap();
        assert!(matches!(err, LaunchError::UnresolvableInput { .. }));
    }
}
