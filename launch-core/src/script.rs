//! Script Data Model and Argument Coercion
//!
//! A [`ResolvedScript`] is the immutable product of a successful resolution:
//! the path to execute, a human-readable display name, an insertion-ordered
//! argument mapping, and a hot-reload capability flag. It is constructed
//! exactly once per resolution call and owned by the caller that requested
//! it.
//!
//! Argument coercion converts raw `key=value` strings into typed values,
//! preferring integers, then floats, then the original string.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::LaunchError;

/// A typed script argument value.
///
/// Coercion order is integer, then float, then string; a value that parses
/// as neither number is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    /// Integer value (e.g. `--frame=5`).
    Int(i64),
    /// Floating-point value (e.g. `--scale=1.5`).
    Float(f64),
    /// Anything that is not a number.
    Str(String),
}

impl ArgValue {
    /// Coerce a raw string into the most specific value type.
    pub fn coerce(raw: &str) -> Self {
        if let Ok(i) = raw.parse::<i64>() {
            return ArgValue::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return ArgValue::Float(f);
        }
        ArgValue::Str(raw.to_string())
    }
}

/// The immutable result of resolving a user-supplied path.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedScript {
    /// Absolute filesystem path of the resource to execute.
    pub path: PathBuf,
    /// Human-readable label; defaults to the path's string form.
    pub display_name: String,
    /// Ordered argument mapping, passed opaquely to the consumer.
    pub arguments: IndexMap<String, ArgValue>,
    /// Whether the consumer may hot-reload this script after first load.
    pub reload_enabled: bool,
}

impl ResolvedScript {
    /// Build a script unit for `path` with the path's string form as the
    /// display name, no arguments, and reloading enabled.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display_name = path.display().to_string();
        Self {
            path,
            display_name,
            arguments: IndexMap::new(),
            reload_enabled: true,
        }
    }

    /// Build the fallback unit for a path no plugin claimed: the path is
    /// treated as a directly-executable script. `reload_enabled` follows
    /// the caller's default policy.
    pub fn direct(path: &Path, reload_enabled: bool) -> Self {
        Self {
            reload_enabled,
            ..Self::new(path)
        }
    }

    /// Replace the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Replace the argument mapping.
    pub fn with_arguments(mut self, arguments: IndexMap<String, ArgValue>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Set the hot-reload capability flag.
    pub fn with_reload(mut self, enabled: bool) -> Self {
        self.reload_enabled = enabled;
        self
    }
}

/// Convert `key=value` strings into an ordered, typed argument mapping.
///
/// Each entry is split on the first `=`; leading hyphens are stripped from
/// the key. Values are coerced via [`ArgValue::coerce`]. Duplicate keys keep
/// their first insertion position but the last value wins.
///
/// An entry without a `=` separator violates the caller contract and yields
/// [`LaunchError::ArgumentParseViolation`].
pub fn coerce_arguments<S: AsRef<str>>(
    raw: &[S],
) -> Result<IndexMap<String, ArgValue>, LaunchError> {
    let mut arguments = IndexMap::new();
    for item in raw {
        let item = item.as_ref();
        let (key, value) = item
            .split_once('=')
            .ok_or_else(|| LaunchError::ArgumentParseViolation {
                arg: item.to_string(),
            })?;
        let key = key.trim_start_matches('-').to_string();
        arguments.insert(key, ArgValue::coerce(value));
    }
    Ok(arguments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_typed_values() {
        let args = coerce_arguments(&["--frame=5", "--scale=1.5", "--name=foo"]).unwrap();
        assert_eq!(args["frame"], ArgValue::Int(5));
        assert_eq!(args["scale"], ArgValue::Float(1.5));
        assert_eq!(args["name"], ArgValue::Str("foo".to_string()));
    }

    #[test]
    fn test_coerce_preserves_insertion_order() {
        let args = coerce_arguments(&["--b=1", "--a=2", "--c=3"]).unwrap();
        let keys: Vec<&str> = args.keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn test_coerce_duplicate_key_last_wins() {
        let args = coerce_arguments(&["--x=1", "--x=2"]).unwrap();
        assert_eq!(args.len(), 1);
        assert_eq!(args["x"], ArgValue::Int(2));
    }

    #[test]
    fn test_coerce_missing_separator_is_violation() {
        let err = coerce_arguments(&["--frame"]).unwrap_err();
        assert!(matches!(err, LaunchError::ArgumentParseViolation { .. }));
    }

    #[test]
    fn test_coerce_value_containing_equals() {
        // Only the first `=` splits key from value.
        let args = coerce_arguments(&["--expr=a=b"]).unwrap();
        assert_eq!(args["expr"], ArgValue::Str("a=b".to_string()));
    }

    #[test]
    fn test_default_display_name_is_path_string() {
        let script = ResolvedScript::new("/tmp/clip.vpy");
        assert_eq!(script.display_name, "/tmp/clip.vpy");
        assert!(script.arguments.is_empty());
        assert!(script.reload_enabled);
    }

    #[test]
    fn test_direct_fallback_respects_default_reload() {
        let script = ResolvedScript::direct(Path::new("/tmp/clip.vpy"), false);
        assert!(!script.reload_enabled);
        assert_eq!(script.display_name, "/tmp/clip.vpy");
    }

    #[test]
    fn test_arguments_serialize_untagged() {
        let script = ResolvedScript::new("/tmp/clip.vpy")
            .with_arguments(coerce_arguments(&["--frame=5", "--name=foo"]).unwrap());
        let json = serde_json::to_value(&script).unwrap();
        assert_eq!(json["arguments"]["frame"], 5);
        assert_eq!(json["arguments"]["name"], "foo");
    }
}
