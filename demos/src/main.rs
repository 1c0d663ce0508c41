//! End-to-end demonstration of the option pipeline.
//!
//! Wires a handful of pipelines to a toy tokenizer and prints the
//! resolved values as JSON. The tokenizer here is deliberately
//! minimal; real parsers supply their own and hand the pipeline its
//! invocations.
//!
//! Try:
//!
//! ```text
//! pipeline-demo --port 8080 --tag a --tag b
//! DEMO_PORT=9090 pipeline-demo --tag x
//! pipeline-demo --color always --old 1
//! ```

use std::collections::HashMap;
use std::process;

use optflow_core::{Invocation, OptionPipeline, ParseContext, ParseError};
use serde_json::json;

/// Groups raw arguments into invocations, keyed by canonical option
/// name. Every demo option takes exactly one value; unknown tokens
/// are skipped.
fn tokenize(args: &[String]) -> HashMap<&'static str, Vec<Invocation>> {
    let known: &[(&[&str], &str)] = &[
        (&["--port", "-p"], "--port"),
        (&["--tag", "-t"], "--tag"),
        (&["--color"], "--color"),
        (&["--old"], "--old"),
    ];

    let mut invocations: HashMap<&'static str, Vec<Invocation>> = HashMap::new();
    let mut tokens = args.iter();
    while let Some(token) = tokens.next() {
        let matched = known
            .iter()
            .find(|(names, _)| names.contains(&token.as_str()));
        if let Some((_, canonical)) = matched {
            if let Some(value) = tokens.next() {
                invocations
                    .entry(*canonical)
                    .or_default()
                    .push(Invocation::single(token.clone(), value.clone()));
            }
        }
    }
    invocations
}

fn run(args: &[String]) -> Result<(), ParseError> {
    let ctx = ParseContext::new();
    let mut invocations = tokenize(args);

    let port = OptionPipeline::new(["--port", "-p"])
        .with_envvar("DEMO_PORT")
        .with_help("port to listen on")
        .convert(|call, raw| {
            raw.parse::<u16>()
                .map_err(|_| call.fail(format!("'{raw}' is not a valid port")))
        })
        .validate_present(|call, port| {
            call.require(*port >= 1024, "ports below 1024 are reserved")
        });

    let tags = OptionPipeline::new(["--tag", "-t"])
        .with_help("attach a tag (repeatable)")
        .multiple();

    let color = OptionPipeline::new(["--color"])
        .with_help("when to use color")
        .default_value("auto".to_string());

    let old = OptionPipeline::new(["--old"])
        .deprecated("--old is deprecated and ignored", "deprecated", false);

    port.finalize(&ctx, invocations.remove("--port").unwrap_or_default())?;
    tags.finalize(&ctx, invocations.remove("--tag").unwrap_or_default())?;
    color.finalize(&ctx, invocations.remove("--color").unwrap_or_default())?;
    old.finalize(&ctx, invocations.remove("--old").unwrap_or_default())?;

    port.post_validate(&ctx)?;
    tags.post_validate(&ctx)?;
    color.post_validate(&ctx)?;
    old.post_validate(&ctx)?;

    let report = json!({
        "port": port.value(),
        "tags": tags.value(),
        "color": color.value(),
        "notices": ctx.messages(),
    });
    println!("{report}");
    Ok(())
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(err) = run(&args) {
        eprintln!("error: {err}");
        process::exit(64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_groups_by_canonical_name() {
        let args: Vec<String> = ["--tag", "a", "-t", "b", "--port", "80"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let invocations = tokenize(&args);
        assert_eq!(invocations["--tag"].len(), 2);
        assert_eq!(invocations["--tag"][1].name, "-t");
        assert_eq!(invocations["--port"][0].values, vec!["80"]);
    }

    #[test]
    fn test_tokenize_skips_unknown_tokens() {
        let args: Vec<String> = ["positional", "--tag", "a"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let invocations = tokenize(&args);
        assert_eq!(invocations.len(), 1);
    }
}
