//! The copy-with-override mechanism and the decorators built on it.
//!
//! Pipelines are immutable; every "modification" here clones the
//! receiver's configuration, applies the change, and returns a new
//! instance with a fresh (unset) value cell. Two primitives carry the
//! whole surface:
//!
//! - [`reconfigured`](crate::OptionPipeline::reconfigured) applies a
//!   sparse [`Overrides`] record without touching the transform stack;
//! - [`with_stages`](crate::OptionPipeline::with_stages) swaps the
//!   transform stack, possibly changing the stage types.
//!
//! Everything else (`convert`, `validate`, `deprecated`, `multiple`,
//! `required`, the `with_*` field builders) is a thin composition of
//! those two.

use std::collections::BTreeMap;
use std::rc::Rc;

use regex::Regex;

use crate::context::CallContext;
use crate::error::{ParseError, Result};
use crate::option::{CompletionCandidates, OptionPipeline};
use crate::transform::{self, AllTransform, EachTransform, Validator, ValueTransform};

/// Sparse set of configuration overrides.
///
/// `None` fields keep the receiver's current setting. Used with
/// [`OptionPipeline::reconfigured`]; the `with_*` builders cover the
/// common single-field cases.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub names: Option<Vec<String>>,
    pub secondary_names: Option<Vec<String>>,
    pub metavar: Option<String>,
    pub nvalues: Option<usize>,
    pub help: Option<String>,
    pub hidden: Option<bool>,
    pub help_tags: Option<BTreeMap<String, String>>,
    pub envvar: Option<String>,
    pub env_split: Option<Regex>,
    pub value_split: Option<Regex>,
    pub completions: Option<CompletionCandidates>,
}

fn compile_split(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| ParseError::Config(format!("invalid split pattern '{pattern}': {e}")))
}

impl<V: 'static, E: 'static, A: 'static> OptionPipeline<V, E, A> {
    /// Copies this pipeline, replacing only the fields set in
    /// `overrides`. The receiver is never mutated.
    ///
    /// # Examples
    ///
    /// ```
    /// use optflow_core::{OptionPipeline, Overrides};
    ///
    /// let original = OptionPipeline::new(["--opt"]);
    /// let renamed = original.reconfigured(Overrides {
    ///     names: Some(vec!["--other".into()]),
    ///     ..Overrides::default()
    /// });
    /// assert_eq!(original.primary_name(), "--opt");
    /// assert_eq!(renamed.primary_name(), "--other");
    /// ```
    pub fn reconfigured(&self, overrides: Overrides) -> Self {
        let mut config = self.config.clone();
        if let Some(names) = overrides.names {
            config.names = names;
        }
        if let Some(secondary_names) = overrides.secondary_names {
            config.secondary_names = secondary_names;
        }
        if let Some(metavar) = overrides.metavar {
            config.metavar = Some(metavar);
        }
        if let Some(nvalues) = overrides.nvalues {
            config.nvalues = nvalues;
        }
        if let Some(help) = overrides.help {
            config.help = help;
        }
        if let Some(hidden) = overrides.hidden {
            config.hidden = hidden;
        }
        if let Some(help_tags) = overrides.help_tags {
            config.help_tags = help_tags;
        }
        if let Some(envvar) = overrides.envvar {
            config.envvar = Some(envvar);
        }
        if let Some(env_split) = overrides.env_split {
            config.env_split = Some(env_split);
        }
        if let Some(value_split) = overrides.value_split {
            config.value_split = Some(value_split);
        }
        if let Some(completions) = overrides.completions {
            config.completions = completions;
        }
        self.with_config(config)
    }

    /// Copies this pipeline with a replacement transform stack,
    /// possibly with new stage types. The configuration is shared;
    /// the value cell starts unset.
    ///
    /// This is the substrate every type-changing decorator is built
    /// from.
    pub fn with_stages<V2, E2, A2>(
        &self,
        value_transform: ValueTransform<V2>,
        each_transform: EachTransform<V2, E2>,
        all_transform: AllTransform<E2, A2>,
        validator: Validator<A2>,
    ) -> OptionPipeline<V2, E2, A2> {
        OptionPipeline {
            config: self.config.clone(),
            value_transform,
            each_transform,
            all_transform,
            validator,
            value: std::cell::OnceCell::new(),
        }
    }

    // -- field builders ------------------------------------------------

    /// Copy with replacement names.
    pub fn with_names<I, S>(&self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reconfigured(Overrides {
            names: Some(names.into_iter().map(Into::into).collect()),
            ..Overrides::default()
        })
    }

    /// Copy with secondary names. Valued options reject these at bind
    /// time; the field exists so flag-style derivations can carry
    /// negated forms.
    pub fn with_secondary_names<I, S>(&self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reconfigured(Overrides {
            secondary_names: Some(names.into_iter().map(Into::into).collect()),
            ..Overrides::default()
        })
    }

    /// Copy with an explicit metavar.
    pub fn with_metavar(&self, metavar: impl Into<String>) -> Self {
        self.reconfigured(Overrides {
            metavar: Some(metavar.into()),
            ..Overrides::default()
        })
    }

    /// Copy with a different arity.
    pub fn with_nvalues(&self, nvalues: usize) -> Self {
        self.reconfigured(Overrides {
            nvalues: Some(nvalues),
            ..Overrides::default()
        })
    }

    /// Copy with help text.
    pub fn with_help(&self, help: impl Into<String>) -> Self {
        self.reconfigured(Overrides {
            help: Some(help.into()),
            ..Overrides::default()
        })
    }

    /// Copy hidden from help output.
    pub fn hidden(&self) -> Self {
        self.reconfigured(Overrides {
            hidden: Some(true),
            ..Overrides::default()
        })
    }

    /// Copy with one help tag merged into the tag map.
    pub fn with_help_tag(&self, name: &str, value: &str) -> Self {
        let mut tags = self.config.help_tags.clone();
        tags.insert(name.to_string(), value.to_string());
        self.reconfigured(Overrides {
            help_tags: Some(tags),
            ..Overrides::default()
        })
    }

    /// Copy with an environment variable fallback.
    pub fn with_envvar(&self, key: impl Into<String>) -> Self {
        self.reconfigured(Overrides {
            envvar: Some(key.into()),
            ..Overrides::default()
        })
    }

    /// Copy with a custom environment-value split pattern (default:
    /// runs of whitespace).
    pub fn with_env_split(&self, pattern: &str) -> Result<Self> {
        Ok(self.reconfigured(Overrides {
            env_split: Some(compile_split(pattern)?),
            ..Overrides::default()
        }))
    }

    /// Copy with a command-line value split pattern. Most callers want
    /// [`split`](OptionPipeline::split), which also adjusts the
    /// per-invocation stage to keep the split pieces together.
    pub fn with_value_split(&self, pattern: &str) -> Result<Self> {
        Ok(self.reconfigured(Overrides {
            value_split: Some(compile_split(pattern)?),
            ..Overrides::default()
        }))
    }

    /// Copy with a completion-candidate source.
    pub fn with_completions(&self, completions: CompletionCandidates) -> Self {
        self.reconfigured(Overrides {
            completions: Some(completions),
            ..Overrides::default()
        })
    }

    // -- transform decorators ------------------------------------------

    /// Copy with a new value transform. Downstream stages reset to
    /// their defaults for the new type: one value per occurrence,
    /// last occurrence wins.
    ///
    /// # Examples
    ///
    /// ```
    /// use optflow_core::{Invocation, OptionPipeline, ParseContext};
    ///
    /// let ctx = ParseContext::new();
    /// let count = OptionPipeline::new(["--count"]).convert(|call, raw| {
    ///     raw.parse::<u32>()
    ///         .map_err(|_| call.fail(format!("'{raw}' is not a number")))
    /// });
    /// count.finalize(&ctx, vec![Invocation::single("--count", "3")])?;
    /// assert_eq!(count.value(), &Some(3));
    /// # Ok::<(), optflow_core::ParseError>(())
    /// ```
    pub fn convert<T: 'static>(
        &self,
        f: impl Fn(&CallContext<'_>, &str) -> Result<T> + 'static,
    ) -> OptionPipeline<T, T, Option<T>> {
        self.with_stages(
            Rc::new(f),
            transform::single_value(),
            transform::last_value(),
            transform::accept_all(),
        )
    }

    /// Copy with a new per-invocation transform; the aggregate stage
    /// resets to last-wins over the new type.
    pub fn transform_each<T: 'static>(
        &self,
        f: impl Fn(&CallContext<'_>, Vec<V>) -> Result<T> + 'static,
    ) -> OptionPipeline<V, T, Option<T>> {
        self.with_stages(
            self.value_transform.clone(),
            Rc::new(f),
            transform::last_value(),
            transform::accept_all(),
        )
    }

    /// Copy with a new aggregate transform, keeping the value and
    /// per-invocation stages.
    pub fn transform_all<T: 'static>(
        &self,
        f: impl Fn(&CallContext<'_>, Vec<E>) -> Result<T> + 'static,
    ) -> OptionPipeline<V, E, T> {
        self.with_stages(
            self.value_transform.clone(),
            self.each_transform.clone(),
            Rc::new(f),
            transform::accept_all(),
        )
    }

    /// Copy with a replacement validator, preserving every transform
    /// stage. The validator runs once after finalize, in an
    /// option-scoped context.
    pub fn validate(&self, f: impl Fn(&CallContext<'_>, &A) -> Result<()> + 'static) -> Self {
        self.with_stages(
            self.value_transform.clone(),
            self.each_transform.clone(),
            self.all_transform.clone(),
            Rc::new(f),
        )
    }

    /// Copy collecting every occurrence's result into a `Vec`, in
    /// invocation order.
    pub fn multiple(&self) -> OptionPipeline<V, E, Vec<E>> {
        self.transform_all(|_ctx, results| Ok(results))
    }

    /// Copy whose aggregate is the last occurrence's result, failing
    /// with a usage error when the option was never given a value.
    pub fn required(&self) -> OptionPipeline<V, E, E> {
        self.transform_all(|ctx, mut results: Vec<E>| match results.pop() {
            Some(last) => Ok(last),
            None => Err(ctx.fail("no value was provided")),
        })
    }

    /// Copy whose aggregate is the last occurrence's result, falling
    /// back to `fallback` when the option was never given a value.
    pub fn default_value(&self, fallback: E) -> OptionPipeline<V, E, E>
    where
        E: Clone,
    {
        self.transform_all(move |_ctx, mut results: Vec<E>| {
            Ok(results.pop().unwrap_or_else(|| fallback.clone()))
        })
    }

    /// Copy marked as deprecated.
    ///
    /// When the option receives at least one occurrence, `message` is
    /// recorded on the advisory channel, or raised as a usage error
    /// when `error` is set. In the advisory case the underlying
    /// aggregate transform still runs and still produces the value.
    /// `tag_name` is merged into the help tags unless blank.
    pub fn deprecated(&self, message: impl Into<String>, tag_name: &str, error: bool) -> Self {
        let message: String = message.into();
        let inner = self.all_transform.clone();
        let all: AllTransform<E, A> = Rc::new(move |ctx, results| {
            if !results.is_empty() {
                if error {
                    return Err(ctx.fail(message.clone()));
                }
                ctx.message(message.clone());
            }
            (inner)(ctx, results)
        });
        let pipeline = self.with_stages(
            self.value_transform.clone(),
            self.each_transform.clone(),
            all,
            self.validator.clone(),
        );
        if tag_name.is_empty() {
            pipeline
        } else {
            pipeline.with_help_tag(tag_name, "")
        }
    }
}

impl<V: 'static, E: 'static, T: 'static> OptionPipeline<V, E, Option<T>> {
    /// Copy with a validator lifted over a possibly-absent aggregate.
    ///
    /// The supplied validator is never invoked when the aggregate is
    /// absent, and always receives the unwrapped value when present.
    pub fn validate_present(
        &self,
        f: impl Fn(&CallContext<'_>, &T) -> Result<()> + 'static,
    ) -> Self {
        self.validate(move |ctx, value| match value {
            Some(present) => f(ctx, present),
            None => Ok(()),
        })
    }
}

impl<V: 'static> OptionPipeline<V, V, Option<V>> {
    /// Copy that splits each command-line value on `pattern` and keeps
    /// the pieces of one occurrence together as a list.
    ///
    /// Each piece goes through the value transform independently, so
    /// `--item a,b` split on `,` converts exactly like two separate
    /// occurrences `a` and `b` would.
    ///
    /// # Examples
    ///
    /// ```
    /// use optflow_core::{Invocation, OptionPipeline, ParseContext};
    ///
    /// let ctx = ParseContext::new();
    /// let items = OptionPipeline::new(["--item"]).split(",")?;
    /// items.finalize(&ctx, vec![Invocation::single("--item", "a,b")])?;
    /// assert_eq!(items.value(), &Some(vec!["a".to_string(), "b".to_string()]));
    /// # Ok::<(), optflow_core::ParseError>(())
    /// ```
    pub fn split(&self, pattern: &str) -> Result<OptionPipeline<V, Vec<V>, Option<Vec<V>>>> {
        let pattern = compile_split(pattern)?;
        Ok(self
            .transform_each(|_ctx, values| Ok(values))
            .reconfigured(Overrides {
                value_split: Some(pattern),
                ..Overrides::default()
            }))
    }
}
