//! Plugin Registry - Ordered Collection of Installed Resolvers
//!
//! Holds the installed [`ResolverPlugin`] set in registration order, which
//! is the resolution priority order. Plugins are either registered
//! in-process or loaded dynamically from shared libraries via libloading;
//! loaded library handles are kept alive for as long as their plugins.
//!
//! Installation, updates, and removal of plugin packages are handled by an
//! external package manager; this registry only exposes the installed set
//! for iteration.

use std::path::{Path, PathBuf};

use anyhow::Context;
use libloading::{Library, Symbol};
use tracing::{debug, info, warn};

use crate::error::LaunchError;
use crate::resolver::ResolverPlugin;

/// Function signature for plugin construction.
///
/// Each plugin library must export a `create_resolver_plugin` function that
/// returns a heap-allocated [`ResolverPlugin`] implementation.
type CreatePluginFn = unsafe extern "C" fn() -> *mut dyn ResolverPlugin;

/// Ordered registry of installed resolver plugins.
///
/// # Safety Model:
/// - Dynamically loaded plugins must be compiled with the same Rust version
/// - Plugins must implement the [`ResolverPlugin`] trait correctly
/// - Libraries are dropped only when the registry is, after all plugins
pub struct PluginRegistry {
    /// Installed plugins, in registration order. Never re-sorted.
    plugins: Vec<Box<dyn ResolverPlugin>>,
    /// Loaded libraries (kept alive to prevent symbol unloading).
    libraries: Vec<Library>,
    /// Plugin search paths for discovery.
    search_paths: Vec<PathBuf>,
    /// Default hot-reload policy for the fallback resolution branch.
    default_reload: bool,
}

impl PluginRegistry {
    /// Create an empty registry with the standard search paths.
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
            libraries: Vec::new(),
            search_paths: vec![
                PathBuf::from("./plugins"),
                PathBuf::from("/usr/lib/launch/plugins"),
                PathBuf::from("/usr/local/lib/launch/plugins"),
            ],
            default_reload: true,
        }
    }

    /// Add a search path for plugin discovery.
    pub fn add_search_path(&mut self, path: PathBuf) {
        self.search_paths.push(path);
    }

    /// Set the hot-reload default applied by the fallback resolution branch.
    pub fn set_default_reload(&mut self, enabled: bool) {
        self.default_reload = enabled;
    }

    /// The hot-reload default applied by the fallback resolution branch.
    pub fn default_reload(&self) -> bool {
        self.default_reload
    }

    /// Register an in-process plugin at the end of the chain.
    ///
    /// A plugin whose namespace is already registered is skipped, since a
    /// duplicate could never be reached by first-match resolution.
    pub fn register(&mut self, plugin: Box<dyn ResolverPlugin>) {
        let namespace = plugin.namespace();
        if self.plugins.iter().any(|p| p.namespace() == namespace) {
            warn!(namespace, "plugin already registered, skipping");
            return;
        }
        info!(namespace, position = self.plugins.len(), "registered resolver plugin");
        self.plugins.push(plugin);
    }

    /// Load a plugin from a shared library and append it to the chain.
    ///
    /// Returns the loaded plugin's namespace identifier.
    pub fn load_plugin(&mut self, path: &Path) -> Result<String, LaunchError> {
        info!(path = %path.display(), "loading resolver plugin");

        let load = || -> anyhow::Result<(Library, Box<dyn ResolverPlugin>)> {
            let lib = unsafe {
                Library::new(path)
                    .with_context(|| format!("failed to load library from {}", path.display()))?
            };
            let create: Symbol<CreatePluginFn> = unsafe {
                lib.get(b"create_resolver_plugin")
                    .context("plugin missing 'create_resolver_plugin' export")?
            };
            let plugin = unsafe { Box::from_raw(create()) };
            Ok((lib, plugin))
        };

        let (lib, plugin) = load().map_err(|source| LaunchError::PluginLoad {
            path: path.to_path_buf(),
            source,
        })?;

        let namespace = plugin.namespace().to_string();
        debug!(namespace = %namespace, "plugin library exports verified");

        self.libraries.push(lib);
        self.register(plugin);
        Ok(namespace)
    }

    /// Discover and load plugins from the search paths.
    ///
    /// Entries within one directory are loaded in lexicographic filename
    /// order so the resulting chain order is deterministic across runs.
    /// Individual load failures are logged and skipped.
    pub fn discover(&mut self) -> Result<Vec<String>, LaunchError> {
        let mut discovered = Vec::new();

        let search_paths = self.search_paths.clone();
        for search_path in &search_paths {
            if !search_path.exists() {
                debug!(path = %search_path.display(), "search path does not exist, skipping");
                continue;
            }

            debug!(path = %search_path.display(), "scanning for plugins");

            let mut candidates: Vec<PathBuf> = std::fs::read_dir(search_path)
                .map_err(|source| LaunchError::PluginLoad {
                    path: search_path.clone(),
                    source: source.into(),
                })?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| {
                    path.extension()
                        .is_some_and(|ext| ext == "so" || ext == "dylib" || ext == "dll")
                })
                .collect();
            candidates.sort();

            for path in candidates {
                match self.load_plugin(&path) {
                    Ok(namespace) => discovered.push(namespace),
                    Err(e) => warn!(path = %path.display(), error = %e, "failed to load plugin"),
                }
            }
        }

        info!(count = discovered.len(), "plugin discovery complete");
        Ok(discovered)
    }

    /// Iterate installed plugins in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn ResolverPlugin> {
        self.plugins.iter().map(Box::as_ref)
    }

    /// Look up a plugin by its namespace identifier.
    pub fn find(&self, namespace: &str) -> Option<&dyn ResolverPlugin> {
        self.iter().find(|p| p.namespace() == namespace)
    }

    /// Number of installed plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` when no plugins are installed.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
