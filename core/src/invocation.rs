//! Invocation records and resolved input origins.
//!
//! This module defines the data that flows into the transform chain:
//! one [`Invocation`] per occurrence of an option, [`ValueGroup`]s
//! delivered by external value sources, and the closed
//! [`ResolvedInput`] union naming where a finalize call's input came
//! from.

use serde::{Deserialize, Serialize};

/// One occurrence of an option, carrying the name it was invoked with
/// and its raw string values in order.
///
/// Invocations are produced by command-line tokenization or
/// synthesized from an environment variable or value source. They are
/// never mutated; splitting produces new invocations.
///
/// # Examples
///
/// ```
/// use optflow_core::Invocation;
///
/// let inv = Invocation::new("--output", vec!["a.txt".into(), "b.txt".into()]);
/// assert_eq!(inv.name, "--output");
/// assert_eq!(inv.values.len(), 2);
///
/// let single = Invocation::single("--port", "8080");
/// assert_eq!(single.values, vec!["8080"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// The name this occurrence used (e.g., `--verbose` or `-v`).
    pub name: String,
    /// Raw string values supplied with this occurrence, in order.
    pub values: Vec<String>,
}

impl Invocation {
    /// Creates an invocation with the given name and values.
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Creates an invocation carrying exactly one value.
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }
}

/// One grouped value-list delivered by an external value source.
///
/// Unlike command-line invocations, value sources deliver values
/// already grouped per occurrence; each group must match the option's
/// declared arity. A group with an empty name is attributed to the
/// option's primary display name downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueGroup {
    /// Name reported by the source, possibly empty.
    pub name: String,
    /// Values for one occurrence, in order.
    pub values: Vec<String>,
}

impl ValueGroup {
    /// Creates a value group with the given name and values.
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Where a finalize call's input came from.
///
/// Exactly one variant is produced per finalize call, and the variant
/// determines which splitting rule applies before the transform chain
/// runs:
///
/// - [`Parsed`](ResolvedInput::Parsed) — invocations from the command
///   line proper (optionally re-split on the value-split pattern).
/// - [`Sourced`](ResolvedInput::Sourced) — groups from an external
///   value source (checked against the declared arity).
/// - [`Envvar`](ResolvedInput::Envvar) — a single raw string from an
///   environment variable, not yet split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedInput {
    /// Invocations collected from the command line. May be empty when
    /// the option was never mentioned and no fallback applied.
    Parsed(Vec<Invocation>),
    /// Grouped value-lists from an external value source.
    Sourced(Vec<ValueGroup>),
    /// A raw environment variable value.
    Envvar { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_construction() {
        let inv = Invocation::new("--file", vec!["a".into(), "b".into()]);
        assert_eq!(inv.name, "--file");
        assert_eq!(inv.values, vec!["a", "b"]);

        let single = Invocation::single("-f", "a");
        assert_eq!(single.values, vec!["a"]);
    }

    #[test]
    fn test_invocation_serde_round_trip() {
        let inv = Invocation::single("--port", "8080");
        let json = serde_json::to_string(&inv).unwrap();
        let back: Invocation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, inv);
    }

    #[test]
    fn test_value_group_deserializes_from_source_shape() {
        let group: ValueGroup =
            serde_json::from_str(r#"{"name": "", "values": ["x", "y"]}"#).unwrap();
        assert_eq!(group.name, "");
        assert_eq!(group.values, vec!["x", "y"]);
    }
}
