//! Input resolution and splitting.
//!
//! Two internal stages run before the transform chain: the resolver
//! decides which origin supplies this parse's input (external value
//! source, command line, environment variable, or nothing), and the
//! splitter normalizes that origin into a flat, ordered invocation
//! list.

use tracing::debug;

use crate::context::ParseContext;
use crate::error::{ParseError, Result};
use crate::invocation::{Invocation, ResolvedInput};
use crate::option::OptionConfig;

/// Picks the input origin for one finalize call.
///
/// Precedence: a value source that yields at least one group wins and
/// skips the environment lookup entirely; otherwise command-line
/// invocations; otherwise a set environment variable; otherwise the
/// empty parsed case, which downstream stages handle without
/// special-casing.
pub(crate) fn resolve_input(
    ctx: &ParseContext,
    config: &OptionConfig,
    invocations: Vec<Invocation>,
) -> ResolvedInput {
    if let Some(groups) = ctx.source_lookup(&config.names) {
        if !groups.is_empty() {
            debug!(
                option = %config.primary_name(),
                groups = groups.len(),
                "Resolved option input from value source"
            );
            return ResolvedInput::Sourced(groups);
        }
    }
    if !invocations.is_empty() {
        debug!(
            option = %config.primary_name(),
            invocations = invocations.len(),
            "Resolved option input from command line"
        );
        return ResolvedInput::Parsed(invocations);
    }
    if let Some(key) = config.envvar.as_deref() {
        if let Some(value) = ctx.env_get(key) {
            debug!(option = %config.primary_name(), envvar = %key, "Resolved option input from environment");
            return ResolvedInput::Envvar {
                key: key.to_string(),
                value,
            };
        }
    }
    ResolvedInput::Parsed(Vec::new())
}

/// Normalizes a resolved input into a flat invocation list.
///
/// - Parsed invocations pass through, re-split on the value-split
///   pattern when one is configured (names preserved, value lists
///   flattened).
/// - Sourced groups are checked against the declared arity; a group
///   with an empty name is attributed to the primary display name.
/// - An environment value splits into single-value invocations named
///   after the variable, on the env-split pattern or runs of
///   whitespace by default.
pub(crate) fn split_input(config: &OptionConfig, input: ResolvedInput) -> Result<Vec<Invocation>> {
    match input {
        ResolvedInput::Parsed(invocations) => Ok(match &config.value_split {
            Some(pattern) => invocations
                .into_iter()
                .map(|invocation| {
                    let Invocation { name, values } = invocation;
                    let split = values
                        .iter()
                        .flat_map(|value| pattern.split(value))
                        .map(str::to_string)
                        .collect();
                    Invocation::new(name, split)
                })
                .collect(),
            None => invocations,
        }),
        ResolvedInput::Sourced(groups) => {
            let mut invocations = Vec::with_capacity(groups.len());
            for group in groups {
                if group.values.len() != config.nvalues {
                    return Err(ParseError::IncorrectCount {
                        name: config.primary_name().to_string(),
                        expected: config.nvalues,
                        got: group.values.len(),
                    });
                }
                let name = if group.name.is_empty() {
                    config.primary_name().to_string()
                } else {
                    group.name
                };
                invocations.push(Invocation::new(name, group.values));
            }
            Ok(invocations)
        }
        ResolvedInput::Envvar { key, value } => {
            let pieces: Vec<String> = match &config.env_split {
                Some(pattern) => pattern
                    .split(&value)
                    .filter(|piece| !piece.is_empty())
                    .map(str::to_string)
                    .collect(),
                None => value.split_whitespace().map(str::to_string).collect(),
            };
            Ok(pieces
                .into_iter()
                .map(|piece| Invocation::single(key.clone(), piece))
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use regex::Regex;

    use super::*;
    use crate::context::StaticSource;
    use crate::invocation::ValueGroup;

    fn config(names: &[&str]) -> OptionConfig {
        OptionConfig::new(names.iter().map(|n| n.to_string()).collect())
    }

    fn env_ctx(pairs: &[(&str, &str)]) -> ParseContext {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ParseContext::new().with_env(env)
    }

    // -----------------------------------------------------------------
    // Resolver precedence
    // -----------------------------------------------------------------

    #[test]
    fn test_value_source_pre_empts_command_line_and_environment() {
        let mut config = config(&["--user"]);
        config.envvar = Some("USER_OPT".into());
        let ctx = env_ctx(&[("USER_OPT", "from-env")])
            .with_value_source(StaticSource::new().add("--user", &["from-source"]));

        let input = resolve_input(
            &ctx,
            &config,
            vec![Invocation::single("--user", "from-cli")],
        );
        assert!(matches!(input, ResolvedInput::Sourced(_)));
    }

    #[test]
    fn test_command_line_beats_environment() {
        let mut config = config(&["--user"]);
        config.envvar = Some("USER_OPT".into());
        let ctx = env_ctx(&[("USER_OPT", "from-env")]);

        let input = resolve_input(&ctx, &config, vec![Invocation::single("--user", "cli")]);
        assert_eq!(
            input,
            ResolvedInput::Parsed(vec![Invocation::single("--user", "cli")])
        );
    }

    #[test]
    fn test_environment_used_when_nothing_else_supplies_values() {
        let mut config = config(&["--user"]);
        config.envvar = Some("USER_OPT".into());
        let ctx = env_ctx(&[("USER_OPT", "from-env")]);

        let input = resolve_input(&ctx, &config, vec![]);
        assert_eq!(
            input,
            ResolvedInput::Envvar {
                key: "USER_OPT".into(),
                value: "from-env".into(),
            }
        );
    }

    #[test]
    fn test_empty_fallback_is_the_empty_parsed_case() {
        let config = config(&["--user"]);
        let ctx = env_ctx(&[]);
        let input = resolve_input(&ctx, &config, vec![]);
        assert_eq!(input, ResolvedInput::Parsed(vec![]));
    }

    #[test]
    fn test_source_yielding_no_groups_does_not_pre_empt() {
        let config = config(&["--user"]);
        let ctx = env_ctx(&[]).with_value_source(StaticSource::new().add("--other", &["x"]));
        let input = resolve_input(&ctx, &config, vec![Invocation::single("--user", "cli")]);
        assert!(matches!(input, ResolvedInput::Parsed(_)));
    }

    // -----------------------------------------------------------------
    // Splitter
    // -----------------------------------------------------------------

    #[test]
    fn test_value_split_flattens_within_the_invocation() {
        let mut config = config(&["--item"]);
        config.value_split = Some(Regex::new(",").unwrap());

        let out = split_input(
            &config,
            ResolvedInput::Parsed(vec![Invocation::single("--item", "a,b")]),
        )
        .unwrap();
        assert_eq!(
            out,
            vec![Invocation::new(
                "--item",
                vec!["a".to_string(), "b".to_string()]
            )]
        );
    }

    #[test]
    fn test_parsed_passes_through_without_split_pattern() {
        let config = config(&["--item"]);
        let invocations = vec![Invocation::single("--item", "a,b")];
        let out = split_input(&config, ResolvedInput::Parsed(invocations.clone())).unwrap();
        assert_eq!(out, invocations);
    }

    #[test]
    fn test_sourced_group_count_must_match_arity() {
        let mut config = config(&["--pair", "-p"]);
        config.nvalues = 2;

        let err = split_input(
            &config,
            ResolvedInput::Sourced(vec![ValueGroup::new("--pair", vec!["only-one".into()])]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ParseError::IncorrectCount {
                name: "--pair".into(),
                expected: 2,
                got: 1,
            }
        );
    }

    #[test]
    fn test_sourced_empty_name_attributed_to_primary_name() {
        let mut config = config(&["--pair"]);
        config.nvalues = 2;

        let out = split_input(
            &config,
            ResolvedInput::Sourced(vec![ValueGroup::new("", vec!["x".into(), "y".into()])]),
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "--pair");
        assert_eq!(out[0].values, vec!["x", "y"]);
    }

    #[test]
    fn test_envvar_splits_on_whitespace_by_default() {
        let config = config(&["--opt"]);
        let out = split_input(
            &config,
            ResolvedInput::Envvar {
                key: "OPT".into(),
                value: "1  2\t3".into(),
            },
        )
        .unwrap();
        assert_eq!(
            out,
            vec![
                Invocation::single("OPT", "1"),
                Invocation::single("OPT", "2"),
                Invocation::single("OPT", "3"),
            ]
        );
    }

    #[test]
    fn test_envvar_custom_split_pattern() {
        let mut config = config(&["--path"]);
        config.env_split = Some(Regex::new(":").unwrap());
        let out = split_input(
            &config,
            ResolvedInput::Envvar {
                key: "SEARCH_PATH".into(),
                value: "/a:/b".into(),
            },
        )
        .unwrap();
        assert_eq!(
            out,
            vec![
                Invocation::single("SEARCH_PATH", "/a"),
                Invocation::single("SEARCH_PATH", "/b"),
            ]
        );
    }

    #[test]
    fn test_blank_envvar_value_yields_no_invocations() {
        let config = config(&["--opt"]);
        let out = split_input(
            &config,
            ResolvedInput::Envvar {
                key: "OPT".into(),
                value: "   ".into(),
            },
        )
        .unwrap();
        assert!(out.is_empty());
    }
}
