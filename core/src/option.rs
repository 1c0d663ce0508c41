//! The option pipeline: configuration, finalize, and post-validation.
//!
//! [`OptionPipeline`] is the primary type in the crate. It holds an
//! immutable configuration, the four transform-chain stages, and the
//! write-once resolved value. "Modification" always goes through the
//! copy mechanism in [`decorate`](crate::decorate); an existing
//! pipeline instance is never mutated.

use std::cell::OnceCell;
use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::{CallContext, ParseContext};
use crate::error::{ParseError, Result};
use crate::invocation::Invocation;
use crate::resolve::{resolve_input, split_input};
use crate::transform::{self, AllTransform, EachTransform, Validator, ValueTransform};

/// Completion-candidate source carried for the completion renderer.
///
/// The pipeline itself never generates completions; it only stores
/// where candidates for this option come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CompletionCandidates {
    /// No completion candidates.
    #[default]
    None,
    /// A fixed candidate list (e.g., the members of a choice).
    Fixed(Vec<String>),
    /// Complete with filesystem paths.
    Path,
}

/// Immutable per-option configuration.
///
/// Shared by every stage of the pipeline. Field "updates" clone the
/// whole record; see [`Overrides`](crate::decorate::Overrides).
#[derive(Debug, Clone)]
pub(crate) struct OptionConfig {
    pub(crate) names: Vec<String>,
    pub(crate) secondary_names: Vec<String>,
    pub(crate) metavar: Option<String>,
    pub(crate) nvalues: usize,
    pub(crate) help: String,
    pub(crate) hidden: bool,
    pub(crate) help_tags: BTreeMap<String, String>,
    pub(crate) envvar: Option<String>,
    pub(crate) env_split: Option<Regex>,
    pub(crate) value_split: Option<Regex>,
    pub(crate) completions: CompletionCandidates,
}

impl OptionConfig {
    pub(crate) fn new(names: Vec<String>) -> Self {
        Self {
            names,
            secondary_names: Vec::new(),
            metavar: None,
            nvalues: 1,
            help: String::new(),
            hidden: false,
            help_tags: BTreeMap::new(),
            envvar: None,
            env_split: None,
            value_split: None,
            completions: CompletionCandidates::None,
        }
    }

    /// The option's primary display name: the longest configured name,
    /// so long forms beat short forms.
    pub(crate) fn primary_name(&self) -> &str {
        self.names
            .iter()
            .max_by_key(|n| n.len())
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Value-resolution and transformation pipeline for a single
/// command-line option.
///
/// The three type parameters thread the transform chain: each raw
/// string becomes a `V`, each invocation's `V`s become one `E`, and
/// all `E`s become the final aggregate `A`. A freshly constructed
/// pipeline is `OptionPipeline<String, String, Option<String>>`:
/// values pass through untouched, each occurrence must carry exactly
/// one value, and the last occurrence wins (or the aggregate is
/// `None` when the option never appeared).
///
/// Instances are immutable. The decorator methods (see the
/// [`decorate`](crate::decorate) module) return modified copies and
/// never touch the receiver, so derived pipelines can be chained
/// safely.
///
/// # Examples
///
/// ```
/// use optflow_core::{Invocation, OptionPipeline, ParseContext};
///
/// let ctx = ParseContext::new();
/// let port = OptionPipeline::new(["--port", "-p"]).convert(|call, raw| {
///     raw.parse::<u16>()
///         .map_err(|_| call.fail(format!("'{raw}' is not a valid port")))
/// });
///
/// port.finalize(&ctx, vec![Invocation::single("--port", "8080")])?;
/// port.post_validate(&ctx)?;
/// assert_eq!(port.value(), &Some(8080));
/// # Ok::<(), optflow_core::ParseError>(())
/// ```
pub struct OptionPipeline<V, E, A> {
    pub(crate) config: OptionConfig,
    pub(crate) value_transform: ValueTransform<V>,
    pub(crate) each_transform: EachTransform<V, E>,
    pub(crate) all_transform: AllTransform<E, A>,
    pub(crate) validator: Validator<A>,
    pub(crate) value: OnceCell<A>,
}

impl<V, E, A> std::fmt::Debug for OptionPipeline<V, E, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OptionPipeline<String, String, Option<String>> {
    /// Creates a pipeline with default stages for the given names.
    ///
    /// Names may be left empty and inferred later via
    /// [`bind`](OptionPipeline::bind).
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            config: OptionConfig::new(names.into_iter().map(Into::into).collect()),
            value_transform: transform::identity_value(),
            each_transform: transform::single_value(),
            all_transform: transform::last_value(),
            validator: transform::accept_all(),
            value: OnceCell::new(),
        }
    }
}

impl<V: 'static, E: 'static, A: 'static> OptionPipeline<V, E, A> {
    /// Copies this pipeline with a replacement configuration and a
    /// fresh, unset value cell.
    pub(crate) fn with_config(&self, config: OptionConfig) -> Self {
        Self {
            config,
            value_transform: self.value_transform.clone(),
            each_transform: self.each_transform.clone(),
            all_transform: self.all_transform.clone(),
            validator: self.validator.clone(),
            value: OnceCell::new(),
        }
    }

    /// Finalizes the option's name set against the field it was bound
    /// to and checks the configuration for structural problems.
    ///
    /// When no explicit name was given, `--kebab-case` is inferred
    /// from `field`. Structural problems (secondary names on a valued
    /// option, names missing their leading dash, a zero arity) are
    /// reported here, at bind time, rather than surfacing later during
    /// a parse.
    ///
    /// # Examples
    ///
    /// ```
    /// use optflow_core::OptionPipeline;
    ///
    /// let opt = OptionPipeline::new(Vec::<String>::new()).bind("log_level")?;
    /// assert_eq!(opt.primary_name(), "--log-level");
    /// # Ok::<(), optflow_core::ParseError>(())
    /// ```
    pub fn bind(&self, field: &str) -> Result<Self> {
        let mut config = self.config.clone();
        if config.names.is_empty() {
            config.names = vec![infer_name(field)];
        }
        for name in &config.names {
            if !name.starts_with('-') {
                return Err(ParseError::Config(format!(
                    "option name '{name}' must start with '-'"
                )));
            }
        }
        if !config.secondary_names.is_empty() {
            return Err(ParseError::Config(format!(
                "{}: secondary names are only valid on flag options",
                config.primary_name()
            )));
        }
        if config.nvalues == 0 {
            return Err(ParseError::Config(format!(
                "{}: an option must consume at least one value per occurrence",
                config.primary_name()
            )));
        }
        Ok(self.with_config(config))
    }

    /// Resolves and transforms this option's value.
    ///
    /// Consumes the invocations the tokenizer gathered for this
    /// option's names, resolves the effective input origin (value
    /// source, command line, environment variable, or nothing),
    /// splits, runs the transform chain, and stores the aggregate.
    /// Runs exactly once per pipeline instance; a second call is a
    /// configuration error.
    pub fn finalize(&self, ctx: &ParseContext, invocations: Vec<Invocation>) -> Result<()> {
        let input = resolve_input(ctx, &self.config, invocations);
        let invocations = split_input(&self.config, input)?;
        debug!(
            option = %self.primary_name(),
            invocations = invocations.len(),
            "Finalizing option"
        );

        let mut results = Vec::with_capacity(invocations.len());
        for invocation in &invocations {
            let call = CallContext::invocation(ctx, &invocation.name);
            let mut converted = Vec::with_capacity(invocation.values.len());
            for raw in &invocation.values {
                converted.push((self.value_transform)(&call, raw)?);
            }
            results.push((self.each_transform)(&call, converted)?);
        }

        let call = CallContext::option(ctx, self.primary_name());
        let aggregate = (self.all_transform)(&call, results)?;
        self.value.set(aggregate).map_err(|_| {
            ParseError::Config(format!("{} was finalized twice", self.primary_name()))
        })
    }

    /// Runs the validator against the resolved value.
    ///
    /// Called once per parse after every option has finalized.
    /// Failures are attributed to the option's primary display name.
    pub fn post_validate(&self, ctx: &ParseContext) -> Result<()> {
        let value = self.value.get().ok_or_else(|| {
            ParseError::Config(format!(
                "{} was validated before it was finalized",
                self.primary_name()
            ))
        })?;
        let call = CallContext::option(ctx, self.primary_name());
        (self.validator)(&call, value)
    }

    /// The resolved value.
    ///
    /// # Panics
    ///
    /// Panics when called before [`finalize`](OptionPipeline::finalize)
    /// has run. That is a programming error in the calling parser, not
    /// a recoverable parse failure; use
    /// [`try_value`](OptionPipeline::try_value) to probe.
    pub fn value(&self) -> &A {
        match self.value.get() {
            Some(value) => value,
            None => panic!(
                "option {} was read before finalize ran",
                self.primary_name()
            ),
        }
    }

    /// The resolved value, or `None` before finalize has run.
    pub fn try_value(&self) -> Option<&A> {
        self.value.get()
    }

    /// All names this option can be invoked with.
    pub fn names(&self) -> &[String] {
        &self.config.names
    }

    /// Secondary (negated) names. Only flags may carry these; a valued
    /// pipeline rejects them at bind time.
    pub fn secondary_names(&self) -> &[String] {
        &self.config.secondary_names
    }

    /// The primary display name used for attribution in errors and
    /// help output.
    pub fn primary_name(&self) -> &str {
        self.config.primary_name()
    }

    /// Number of raw values each occurrence must supply.
    pub fn nvalues(&self) -> usize {
        self.config.nvalues
    }

    /// The placeholder shown in help output. Falls back to the primary
    /// name uppercased, or `VALUE` when no name is set.
    ///
    /// # Examples
    ///
    /// ```
    /// use optflow_core::OptionPipeline;
    ///
    /// let opt = OptionPipeline::new(["--log-level"]);
    /// assert_eq!(opt.metavar(), "LOG_LEVEL");
    /// ```
    pub fn metavar(&self) -> String {
        if let Some(metavar) = &self.config.metavar {
            return metavar.clone();
        }
        let derived = self
            .primary_name()
            .trim_start_matches('-')
            .replace('-', "_")
            .to_uppercase();
        if derived.is_empty() {
            "VALUE".to_string()
        } else {
            derived
        }
    }

    /// Help text for this option.
    pub fn help(&self) -> &str {
        &self.config.help
    }

    /// Whether the option is hidden from help output.
    pub fn is_hidden(&self) -> bool {
        self.config.hidden
    }

    /// Display tags merged into help output (e.g., `deprecated`).
    pub fn help_tags(&self) -> &BTreeMap<String, String> {
        &self.config.help_tags
    }

    /// The configured environment variable fallback, if any.
    pub fn envvar(&self) -> Option<&str> {
        self.config.envvar.as_deref()
    }

    /// Where completion candidates for this option come from.
    pub fn completion_candidates(&self) -> &CompletionCandidates {
        &self.config.completions
    }
}

/// Derives an option name from a bound field name: `log_level`
/// becomes `--log-level`.
fn infer_name(field: &str) -> String {
    format!("--{}", field.trim_matches('_').replace('_', "-"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::ParseError;

    fn plain_ctx() -> ParseContext {
        ParseContext::new().with_env(HashMap::<String, String>::new())
    }

    #[test]
    fn test_last_invocation_wins_by_default() {
        let ctx = plain_ctx();
        let opt = OptionPipeline::new(["--opt"]);
        opt.finalize(
            &ctx,
            vec![
                Invocation::single("--opt", "1"),
                Invocation::single("--opt", "2"),
            ],
        )
        .unwrap();
        assert_eq!(opt.value(), &Some("2".to_string()));
    }

    #[test]
    fn test_zero_invocations_yield_absent_aggregate() {
        let ctx = plain_ctx();
        let opt = OptionPipeline::new(["--opt"]);
        opt.finalize(&ctx, vec![]).unwrap();
        assert_eq!(opt.value(), &None);
    }

    #[test]
    fn test_envvar_fallback_splits_on_whitespace() {
        let env: HashMap<String, String> = [("OPT".to_string(), "1 2 3".to_string())].into();
        let ctx = ParseContext::new().with_env(env);
        let opt = OptionPipeline::new(["--opt"]).with_envvar("OPT");
        opt.finalize(&ctx, vec![]).unwrap();
        assert_eq!(opt.value(), &Some("3".to_string()));
    }

    #[test]
    fn test_conversion_failure_names_the_invocation() {
        let ctx = plain_ctx();
        let opt = OptionPipeline::new(["--count", "-c"]).convert(|call, raw| {
            raw.parse::<i64>()
                .map_err(|_| call.fail(format!("'{raw}' is not an integer")))
        });
        let err = opt
            .finalize(&ctx, vec![Invocation::single("-c", "abc")])
            .unwrap_err();
        assert_eq!(
            err,
            ParseError::BadValue {
                name: "-c".into(),
                message: "'abc' is not an integer".into(),
            }
        );
    }

    #[test]
    fn test_double_finalize_is_a_config_error() {
        let ctx = plain_ctx();
        let opt = OptionPipeline::new(["--opt"]);
        opt.finalize(&ctx, vec![]).unwrap();
        assert!(matches!(
            opt.finalize(&ctx, vec![]),
            Err(ParseError::Config(_))
        ));
    }

    #[test]
    fn test_post_validate_before_finalize_is_a_config_error() {
        let ctx = plain_ctx();
        let opt = OptionPipeline::new(["--opt"]);
        assert!(matches!(
            opt.post_validate(&ctx),
            Err(ParseError::Config(_))
        ));
    }

    #[test]
    fn test_try_value_probes_without_panicking() {
        let ctx = plain_ctx();
        let opt = OptionPipeline::new(["--opt"]);
        assert!(opt.try_value().is_none());
        opt.finalize(&ctx, vec![]).unwrap();
        assert!(opt.try_value().is_some());
    }

    #[test]
    #[should_panic(expected = "before finalize ran")]
    fn test_value_before_finalize_panics() {
        let opt = OptionPipeline::new(["--opt"]);
        let _ = opt.value();
    }

    #[test]
    fn test_bind_infers_kebab_case_name() {
        let opt = OptionPipeline::new(Vec::<String>::new())
            .bind("user_name")
            .unwrap();
        assert_eq!(opt.names(), ["--user-name"]);
    }

    #[test]
    fn test_bind_keeps_explicit_names() {
        let opt = OptionPipeline::new(["-n", "--name"]).bind("ignored").unwrap();
        assert_eq!(opt.names(), ["-n", "--name"]);
        assert_eq!(opt.primary_name(), "--name");
    }

    #[test]
    fn test_bind_rejects_names_without_dash() {
        let err = OptionPipeline::new(["name"]).bind("name").unwrap_err();
        assert!(matches!(err, ParseError::Config(_)));
    }

    #[test]
    fn test_bind_rejects_secondary_names_on_valued_option() {
        let err = OptionPipeline::new(["--flag"])
            .with_secondary_names(["--no-flag"])
            .bind("flag")
            .unwrap_err();
        assert!(matches!(err, ParseError::Config(_)));
    }

    #[test]
    fn test_bind_rejects_zero_arity() {
        let err = OptionPipeline::new(["--opt"])
            .with_nvalues(0)
            .bind("opt")
            .unwrap_err();
        assert!(matches!(err, ParseError::Config(_)));
    }

    #[test]
    fn test_metavar_falls_back_to_derived_name() {
        assert_eq!(OptionPipeline::new(["--log-level"]).metavar(), "LOG_LEVEL");
        assert_eq!(
            OptionPipeline::new(["--opt"]).with_metavar("N").metavar(),
            "N"
        );
        assert_eq!(OptionPipeline::new(Vec::<String>::new()).metavar(), "VALUE");
    }
}
