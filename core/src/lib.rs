//! Value resolution and transformation for command-line options.
//!
//! This crate implements the per-option value pipeline of an argument
//! parser: it takes the raw textual occurrences of one option
//! (command-line tokens, an environment variable, or an external value
//! source), runs them through a three-stage typed transform chain, and
//! produces one fully typed, validated value.
//!
//! - [`OptionPipeline`] — the pipeline itself: configuration, the
//!   transform stages, and the write-once resolved value.
//! - [`Invocation`] / [`ValueGroup`] / [`ResolvedInput`] — the data
//!   flowing in.
//! - [`ParseContext`] / [`CallContext`] — execution contexts carrying
//!   collaborators and scoped failure/messaging operations.
//! - [`ParseError`] — every way a pipeline can abort a parse.
//!
//! Resolution order is value source, then command line, then
//! environment variable; the transform chain then runs value → each →
//! all, and the validator checks the aggregate once everything has
//! finalized. Pipelines are immutable: decorators like
//! [`convert`](OptionPipeline::convert),
//! [`validate`](OptionPipeline::validate) and
//! [`deprecated`](OptionPipeline::deprecated) return modified copies,
//! so derived options never disturb the pipeline they came from.
//!
//! # Example
//!
//! ```
//! use optflow_core::{Invocation, OptionPipeline, ParseContext};
//!
//! let ctx = ParseContext::new();
//! let port = OptionPipeline::new(["--port", "-p"])
//!     .convert(|call, raw| {
//!         raw.parse::<u16>()
//!             .map_err(|_| call.fail(format!("'{raw}' is not a valid port")))
//!     })
//!     .validate_present(|call, port| {
//!         call.require(*port >= 1024, "ports below 1024 are reserved")
//!     });
//!
//! // Two occurrences: the last one wins under the default policy.
//! port.finalize(
//!     &ctx,
//!     vec![
//!         Invocation::single("--port", "8080"),
//!         Invocation::single("-p", "9090"),
//!     ],
//! )?;
//! port.post_validate(&ctx)?;
//! assert_eq!(port.value(), &Some(9090));
//! # Ok::<(), optflow_core::ParseError>(())
//! ```

pub mod context;
pub mod decorate;
pub mod error;
pub mod invocation;
pub mod option;
pub mod transform;

mod resolve;

pub use context::{
    CallContext, CallScope, EnvLookup, ParseContext, ProcessEnv, StaticSource, ValueSource,
};
pub use decorate::Overrides;
pub use error::{ParseError, Result};
pub use invocation::{Invocation, ResolvedInput, ValueGroup};
pub use option::{CompletionCandidates, OptionPipeline};
pub use transform::{AllTransform, EachTransform, Validator, ValueTransform};
