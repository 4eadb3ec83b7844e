// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Declarative condition model and evaluator.
//!
//! A condition group is a flat map from context attribute name to a check.
//! Checks are decoded **once** when a policy is loaded, not re-interpreted on
//! every evaluation:
//!
//! - a bare scalar decodes to an equality check
//! - an `{"operator": ..., "value": ...}` object decodes to one of the
//!   supported operators (`eq`, `ne`, `gt`, `lt`, `in`, `not_in`, `regex`)
//! - anything else decodes to [`ConditionCheck::Unsupported`], which never
//!   matches (fail closed, not an error)
//!
//! Evaluation ANDs all keys in the group. A key missing from the context
//! fails the whole group immediately; there is no OR/NOT nesting.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::Value;

use crate::context::EvalContext;

/// A single decoded check against one context attribute.
#[derive(Debug, Clone)]
pub enum ConditionCheck {
	/// Context value must equal the expected value.
	Equals(Value),
	/// Context value must differ from the expected value.
	NotEquals(Value),
	/// Context value must be strictly greater than the expected value.
	GreaterThan(Value),
	/// Context value must be strictly less than the expected value.
	LessThan(Value),
	/// Context value must be a member of the expected collection.
	In(Vec<Value>),
	/// Context value must not be a member of the expected collection.
	NotIn(Vec<Value>),
	/// String form of the context value must match the pattern, anchored at
	/// the start.
	Regex(RegexCheck),
	/// Operator (or operand shape) the evaluator does not understand.
	/// Never matches, so a malformed policy silently never applies.
	Unsupported(String),
}

/// A compiled regex check. An invalid pattern keeps `compiled` empty and the
/// check never matches.
#[derive(Debug, Clone)]
pub struct RegexCheck {
	pub pattern: String,
	compiled: Option<regex::Regex>,
}

impl RegexCheck {
	fn new(pattern: String) -> Self {
		// Anchor at the start of the subject string only; the pattern may
		// still match a prefix.
		let compiled = match regex::Regex::new(&format!("^(?:{pattern})")) {
			Ok(re) => Some(re),
			Err(e) => {
				tracing::warn!(pattern = %pattern, error = %e, "invalid regex in policy condition");
				None
			}
		};
		Self { pattern, compiled }
	}

	fn matches(&self, subject: &str) -> bool {
		self.compiled.as_ref().is_some_and(|re| re.is_match(subject))
	}
}

impl ConditionCheck {
	/// Decode one condition entry. Bare scalars (and bare arrays) become
	/// equality checks; an operator object dispatches on its `operator` key.
	pub fn decode(raw: &Value) -> Self {
		let Value::Object(map) = raw else {
			return ConditionCheck::Equals(raw.clone());
		};

		// Wire shape: {"operator": "...", "value": ...}. An object without
		// an operator key defaults to equality.
		let operator = map
			.get("operator")
			.and_then(Value::as_str)
			.unwrap_or("eq")
			.to_string();
		let operand = map.get("value").cloned().unwrap_or(Value::Null);

		match operator.as_str() {
			"eq" => ConditionCheck::Equals(operand),
			"ne" => ConditionCheck::NotEquals(operand),
			"gt" => ConditionCheck::GreaterThan(operand),
			"lt" => ConditionCheck::LessThan(operand),
			"in" | "not_in" => match operand {
				Value::Array(items) => {
					if operator == "in" {
						ConditionCheck::In(items)
					} else {
						ConditionCheck::NotIn(items)
					}
				}
				_ => {
					tracing::warn!(operator = %operator, "membership operator requires an array operand");
					ConditionCheck::Unsupported(operator)
				}
			},
			"regex" => match operand {
				Value::String(pattern) => ConditionCheck::Regex(RegexCheck::new(pattern)),
				_ => {
					tracing::warn!("regex operator requires a string pattern");
					ConditionCheck::Unsupported(operator)
				}
			},
			other => {
				tracing::warn!(operator = %other, "unknown condition operator; check will never match");
				ConditionCheck::Unsupported(operator)
			}
		}
	}

	/// Test this check against one context value.
	pub fn matches(&self, actual: &Value) -> bool {
		match self {
			ConditionCheck::Equals(expected) => json_eq(actual, expected),
			ConditionCheck::NotEquals(expected) => !json_eq(actual, expected),
			ConditionCheck::GreaterThan(expected) => {
				json_cmp(actual, expected) == Some(Ordering::Greater)
			}
			ConditionCheck::LessThan(expected) => json_cmp(actual, expected) == Some(Ordering::Less),
			ConditionCheck::In(items) => items.iter().any(|item| json_eq(actual, item)),
			ConditionCheck::NotIn(items) => !items.iter().any(|item| json_eq(actual, item)),
			ConditionCheck::Regex(check) => check.matches(&value_as_string(actual)),
			ConditionCheck::Unsupported(_) => false,
		}
	}
}

/// One condition group: an ordered mapping from context attribute name to a
/// decoded check. Empty groups are vacuously true.
#[derive(Debug, Clone, Default)]
pub struct ConditionSet {
	checks: BTreeMap<String, ConditionCheck>,
}

impl ConditionSet {
	/// Decode a stored condition group. `None` or a non-object value decodes
	/// to the empty (vacuously true) group.
	pub fn decode(raw: Option<&Value>) -> Self {
		let mut checks = BTreeMap::new();
		if let Some(Value::Object(map)) = raw {
			for (key, entry) in map {
				checks.insert(key.clone(), ConditionCheck::decode(entry));
			}
		}
		Self { checks }
	}

	pub fn is_empty(&self) -> bool {
		self.checks.is_empty()
	}

	pub fn len(&self) -> usize {
		self.checks.len()
	}

	/// Evaluate every check against the context.
	///
	/// All checks must pass (implicit AND). A key absent from the context
	/// fails immediately; missing data never matches as a wildcard.
	pub fn evaluate(&self, context: &EvalContext) -> bool {
		for (key, check) in &self.checks {
			let Some(actual) = context.get(key) else {
				return false;
			};
			if !check.matches(actual) {
				return false;
			}
		}
		true
	}
}

/// Equality with numeric normalization: `1` and `1.0` compare equal, other
/// type pairings fall back to strict JSON equality.
fn json_eq(a: &Value, b: &Value) -> bool {
	match (a.as_f64(), b.as_f64()) {
		(Some(x), Some(y)) if a.is_number() && b.is_number() => x == y,
		_ => a == b,
	}
}

/// Ordering for `gt`/`lt`: numbers compare numerically, strings compare
/// lexicographically, every other pairing is incomparable (fails closed).
fn json_cmp(a: &Value, b: &Value) -> Option<Ordering> {
	match (a, b) {
		(Value::Number(_), Value::Number(_)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
		(Value::String(x), Value::String(y)) => Some(x.cmp(y)),
		_ => None,
	}
}

/// String form of a context value for regex matching. Strings are used as-is;
/// everything else uses its JSON rendering.
fn value_as_string(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}
