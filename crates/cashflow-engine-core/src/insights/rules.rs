//! Ordered (predicate, message) recommendation rules.
//!
//! Rules are plain data evaluated in sequence against a context value, so a
//! rule set can be unit-tested without running the rest of the engine.

pub struct Rule<C> {
    pub name: &'static str,
    pub applies: fn(&C) -> bool,
    pub message: fn(&C) -> String,
}

impl<C> Rule<C> {
    pub fn new(name: &'static str, applies: fn(&C) -> bool, message: fn(&C) -> String) -> Self {
        Self {
            name,
            applies,
            message,
        }
    }
}

/// Messages of every rule whose predicate holds, in rule order.
pub fn evaluate<C>(rules: &[Rule<C>], ctx: &C) -> Vec<String> {
    rules
        .iter()
        .filter(|r| (r.applies)(ctx))
        .map(|r| (r.message)(ctx))
        .collect()
}

/// Like [`evaluate`], but yields `fallback` when no rule fires.
pub fn evaluate_or<C>(rules: &[Rule<C>], ctx: &C, fallback: &str) -> Vec<String> {
    let recs = evaluate(rules, ctx);
    if recs.is_empty() {
        vec![fallback.to_string()]
    } else {
        recs
    }
}

/// Names of the rules that fire, for diagnostics and tests.
pub fn fired<C>(rules: &[Rule<C>], ctx: &C) -> Vec<&'static str> {
    rules
        .iter()
        .filter(|r| (r.applies)(ctx))
        .map(|r| r.name)
        .collect()
}
