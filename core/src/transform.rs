//! Transform stage signatures and default stages.
//!
//! The transform chain threads types through three swappable stages:
//! raw string → `V` (per value) → `E` (per invocation) → `A` (final
//! aggregate), plus a validator over `A`. Stages are plain function
//! values stored behind [`Rc`] so that reconfigured pipeline copies
//! share them cheaply.

use std::rc::Rc;

use crate::context::CallContext;
use crate::error::{ParseError, Result};

/// Converts one raw string value into a typed value.
pub type ValueTransform<V> = Rc<dyn Fn(&CallContext<'_>, &str) -> Result<V>>;

/// Reduces the converted values of one invocation into a
/// per-invocation result.
pub type EachTransform<V, E> = Rc<dyn Fn(&CallContext<'_>, Vec<V>) -> Result<E>>;

/// Reduces all per-invocation results, in invocation order, into the
/// final aggregate value.
pub type AllTransform<E, A> = Rc<dyn Fn(&CallContext<'_>, Vec<E>) -> Result<A>>;

/// Checks the final aggregate value after it has been computed.
pub type Validator<A> = Rc<dyn Fn(&CallContext<'_>, &A) -> Result<()>>;

/// Default value transform: passes the raw string through unchanged.
pub fn identity_value() -> ValueTransform<String> {
    Rc::new(|_ctx, raw| Ok(raw.to_string()))
}

/// Default per-invocation transform: requires exactly one value and
/// unwraps it.
///
/// Receiving any other count means the pipeline was declared with an
/// arity this stage cannot consume; that is a configuration error on
/// the caller's part, never silent truncation.
pub fn single_value<V: 'static>() -> EachTransform<V, V> {
    Rc::new(|ctx, mut values: Vec<V>| {
        if values.len() == 1 {
            Ok(values.swap_remove(0))
        } else {
            Err(ParseError::Config(format!(
                "{} supplied {} values per occurrence but the default \
                 per-invocation stage consumes exactly one; replace the stage \
                 or adjust the arity",
                ctx.name(),
                values.len()
            )))
        }
    })
}

/// Default aggregate transform: the last invocation's result wins, or
/// `None` when the option was never invoked.
pub fn last_value<E: 'static>() -> AllTransform<E, Option<E>> {
    Rc::new(|_ctx, mut results: Vec<E>| Ok(results.pop()))
}

/// Default validator: accepts every value.
pub fn accept_all<A: 'static>() -> Validator<A> {
    Rc::new(|_ctx, _value| Ok(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ParseContext;

    #[test]
    fn test_single_value_unwraps_one() {
        let parse = ParseContext::new();
        let ctx = CallContext::invocation(&parse, "--name");
        let each = single_value::<String>();
        assert_eq!(each(&ctx, vec!["x".to_string()]).unwrap(), "x");
    }

    #[test]
    fn test_single_value_rejects_other_counts() {
        let parse = ParseContext::new();
        let ctx = CallContext::invocation(&parse, "--name");
        let each = single_value::<String>();
        assert!(matches!(
            each(&ctx, vec!["x".to_string(), "y".to_string()]),
            Err(ParseError::Config(_))
        ));
        assert!(matches!(each(&ctx, vec![]), Err(ParseError::Config(_))));
    }

    #[test]
    fn test_last_value_takes_last_or_none() {
        let parse = ParseContext::new();
        let ctx = CallContext::option(&parse, "--name");
        let all = last_value::<i64>();
        assert_eq!(all(&ctx, vec![1, 2, 3]).unwrap(), Some(3));
        assert_eq!(all(&ctx, vec![]).unwrap(), None);
    }
}
