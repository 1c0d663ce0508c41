//! Execution contexts for a single parse.
//!
//! [`ParseContext`] carries the collaborators a pipeline consults
//! while finalizing (environment lookup, external value source) and
//! the non-fatal user-message channel. [`CallContext`] is the narrow
//! view handed into user-supplied transform and validation callbacks:
//! it exposes failure and messaging operations scoped to either a
//! single invocation or the option as a whole, differing only in how
//! failures are attributed.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::{ParseError, Result};
use crate::invocation::ValueGroup;

/// Read-only environment variable access.
///
/// The pipeline never reads the process environment directly; it goes
/// through this seam so tests and embedders can substitute their own
/// lookup.
pub trait EnvLookup {
    /// Returns the value of `key`, or `None` when unset.
    fn get(&self, key: &str) -> Option<String>;
}

/// [`EnvLookup`] backed by the real process environment.
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvLookup for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// External provider of option values (e.g., a config file) that can
/// pre-empt command-line and environment resolution.
pub trait ValueSource {
    /// Returns grouped values for any of the given option names, or
    /// `None` when the source has nothing for this option.
    fn lookup(&self, names: &[String]) -> Option<Vec<ValueGroup>>;
}

/// In-memory [`ValueSource`] mapping option names to value groups.
///
/// # Examples
///
/// ```
/// use optflow_core::{StaticSource, ValueSource};
///
/// let source = StaticSource::new().add("--user", &["alice"]);
/// let groups = source.lookup(&["--user".to_string()]).unwrap();
/// assert_eq!(groups[0].values, vec!["alice"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    entries: HashMap<String, Vec<ValueGroup>>,
}

impl StaticSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one value group for `option`.
    pub fn add(mut self, option: &str, values: &[&str]) -> Self {
        self.entries
            .entry(option.to_string())
            .or_default()
            .push(ValueGroup::new(
                option,
                values.iter().map(|v| v.to_string()).collect(),
            ));
        self
    }

    /// Appends a pre-built group (e.g., one with an empty name) for
    /// `option`.
    pub fn add_group(mut self, option: &str, group: ValueGroup) -> Self {
        self.entries
            .entry(option.to_string())
            .or_default()
            .push(group);
        self
    }
}

impl ValueSource for StaticSource {
    fn lookup(&self, names: &[String]) -> Option<Vec<ValueGroup>> {
        let groups: Vec<ValueGroup> = names
            .iter()
            .filter_map(|name| self.entries.get(name))
            .flatten()
            .cloned()
            .collect();
        if groups.is_empty() { None } else { Some(groups) }
    }
}

/// State shared by every option pipeline in one parse.
///
/// Owns the environment lookup, the optional external value source,
/// and the advisory user-message channel. Advisory messages (e.g.,
/// deprecation notices) never abort a parse; the driver reads them
/// via [`messages`](ParseContext::messages) once parsing finishes.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use optflow_core::ParseContext;
///
/// let env: HashMap<String, String> =
///     [("MYTOOL_PORT".to_string(), "8080".to_string())].into();
/// let ctx = ParseContext::new().with_env(env);
/// assert!(ctx.messages().is_empty());
/// ```
pub struct ParseContext {
    env: Box<dyn EnvLookup>,
    source: Option<Box<dyn ValueSource>>,
    messages: RefCell<Vec<String>>,
}

impl ParseContext {
    /// Creates a context reading the real process environment, with
    /// no external value source.
    pub fn new() -> Self {
        Self {
            env: Box::new(ProcessEnv),
            source: None,
            messages: RefCell::new(Vec::new()),
        }
    }

    /// Replaces the environment lookup.
    pub fn with_env(mut self, env: impl EnvLookup + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Attaches an external value source.
    pub fn with_value_source(mut self, source: impl ValueSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Advisory messages recorded so far, in order.
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    pub(crate) fn env_get(&self, key: &str) -> Option<String> {
        self.env.get(key)
    }

    pub(crate) fn source_lookup(&self, names: &[String]) -> Option<Vec<ValueGroup>> {
        self.source.as_ref().and_then(|s| s.lookup(names))
    }

    pub(crate) fn record_message(&self, message: String) {
        self.messages.borrow_mut().push(message);
    }
}

impl Default for ParseContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Attribution scope of a [`CallContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallScope {
    /// Scoped to a single occurrence; failures become
    /// [`ParseError::BadValue`] attributed to the invoking name.
    Invocation,
    /// Scoped to the option as a whole; failures become
    /// [`ParseError::Usage`] attributed to the primary display name.
    Option,
}

/// Narrow execution context handed to transform and validation
/// callbacks.
///
/// The two scopes share one capability surface ([`fail`], [`message`]
/// and [`require`]) and differ only in the attribution carried by the
/// errors they produce.
///
/// [`fail`]: CallContext::fail
/// [`message`]: CallContext::message
/// [`require`]: CallContext::require
pub struct CallContext<'a> {
    parse: &'a ParseContext,
    scope: CallScope,
    name: &'a str,
}

impl<'a> CallContext<'a> {
    pub(crate) fn invocation(parse: &'a ParseContext, name: &'a str) -> Self {
        Self {
            parse,
            scope: CallScope::Invocation,
            name,
        }
    }

    pub(crate) fn option(parse: &'a ParseContext, name: &'a str) -> Self {
        Self {
            parse,
            scope: CallScope::Option,
            name,
        }
    }

    /// The name failures from this context are attributed to.
    pub fn name(&self) -> &str {
        self.name
    }

    /// This context's attribution scope.
    pub fn scope(&self) -> CallScope {
        self.scope
    }

    /// Builds the aborting error appropriate for this scope. The
    /// caller decides whether to return it.
    pub fn fail(&self, message: impl Into<String>) -> ParseError {
        match self.scope {
            CallScope::Invocation => ParseError::BadValue {
                name: self.name.to_string(),
                message: message.into(),
            },
            CallScope::Option => ParseError::Usage {
                name: self.name.to_string(),
                message: message.into(),
            },
        }
    }

    /// Fails with [`fail`](CallContext::fail) unless `condition`
    /// holds.
    pub fn require(&self, condition: bool, message: impl Into<String>) -> Result<()> {
        if condition {
            Ok(())
        } else {
            Err(self.fail(message))
        }
    }

    /// Records a non-fatal advisory message on the enclosing parse.
    pub fn message(&self, message: impl Into<String>) {
        self.parse.record_message(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_scope_fails_with_bad_value() {
        let parse = ParseContext::new();
        let ctx = CallContext::invocation(&parse, "--port");
        assert_eq!(
            ctx.fail("not a number"),
            ParseError::BadValue {
                name: "--port".into(),
                message: "not a number".into(),
            }
        );
    }

    #[test]
    fn test_option_scope_fails_with_usage() {
        let parse = ParseContext::new();
        let ctx = CallContext::option(&parse, "--port");
        assert_eq!(
            ctx.fail("must be even"),
            ParseError::Usage {
                name: "--port".into(),
                message: "must be even".into(),
            }
        );
    }

    #[test]
    fn test_require_passes_and_fails() {
        let parse = ParseContext::new();
        let ctx = CallContext::option(&parse, "--level");
        assert!(ctx.require(true, "unused").is_ok());
        assert!(matches!(
            ctx.require(false, "out of range"),
            Err(ParseError::Usage { .. })
        ));
    }

    #[test]
    fn test_messages_are_recorded_in_order() {
        let parse = ParseContext::new();
        let ctx = CallContext::option(&parse, "--old");
        ctx.message("first");
        ctx.message("second");
        assert_eq!(parse.messages(), vec!["first", "second"]);
    }

    #[test]
    fn test_map_env_lookup() {
        let env: HashMap<String, String> = [("KEY".to_string(), "value".to_string())].into();
        let ctx = ParseContext::new().with_env(env);
        assert_eq!(ctx.env_get("KEY"), Some("value".to_string()));
        assert_eq!(ctx.env_get("MISSING"), None);
    }

    #[test]
    fn test_static_source_gathers_groups_across_names() {
        let source = StaticSource::new()
            .add("--user", &["alice"])
            .add("-u", &["bob"]);
        let groups = source
            .lookup(&["--user".to_string(), "-u".to_string()])
            .unwrap();
        assert_eq!(groups.len(), 2);
        assert!(source.lookup(&["--other".to_string()]).is_none());
    }
}
