// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy model.
//!
//! A policy carries four independent condition groups (subject, resource,
//! action, environment) over the same flat evaluation context, plus the
//! effect produced when all four groups pass. Condition groups are decoded
//! from their stored JSON form into the typed model when the policy is
//! loaded, so evaluation never re-interprets raw JSON.

use serde_json::Value;

use crate::condition::ConditionSet;
use crate::context::EvalContext;
use crate::types::{AssignmentId, AssignmentKind, Effect, PolicyId, PolicyKind};

/// A loaded policy with decoded condition groups.
#[derive(Debug, Clone)]
pub struct Policy {
	pub id: PolicyId,
	pub name: String,
	pub description: Option<String>,
	/// Advisory label only; the outcome of a match is always `effect`.
	pub policy_type: PolicyKind,
	/// Lower value evaluates first. Ties break on ascending ID.
	pub priority: i64,
	pub is_active: bool,
	pub subject_conditions: ConditionSet,
	pub resource_conditions: ConditionSet,
	pub action_conditions: ConditionSet,
	pub environment_conditions: ConditionSet,
	pub effect: Effect,
	/// Opaque payload handed back to the caller on match; not interpreted
	/// by the engine.
	pub obligations: Option<Value>,
}

impl Policy {
	/// True iff all four condition groups pass against the context. Empty
	/// groups are vacuously satisfied, so a policy with no conditions
	/// matches any context.
	pub fn matches(&self, context: &EvalContext) -> bool {
		self.subject_conditions.evaluate(context)
			&& self.resource_conditions.evaluate(context)
			&& self.action_conditions.evaluate(context)
			&& self.environment_conditions.evaluate(context)
	}

	/// Sort key for candidate ordering: ascending priority, then ascending
	/// ID as the stable tiebreak.
	pub fn evaluation_order(&self) -> (i64, PolicyId) {
		(self.priority, self.id)
	}
}

/// Fields for creating a policy. Condition groups arrive as raw JSON and
/// are stored verbatim; decoding happens on read.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewPolicy {
	pub name: String,
	pub description: Option<String>,
	pub policy_type: PolicyKind,
	#[serde(default = "default_priority")]
	pub priority: i64,
	pub subject_conditions: Option<Value>,
	pub resource_conditions: Option<Value>,
	pub action_conditions: Option<Value>,
	pub environment_conditions: Option<Value>,
	pub effect: Effect,
	pub obligations: Option<Value>,
}

fn default_priority() -> i64 {
	100
}

/// Partial update for a policy; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct PolicyUpdate {
	pub description: Option<String>,
	pub priority: Option<i64>,
	pub is_active: Option<bool>,
	pub subject_conditions: Option<Value>,
	pub resource_conditions: Option<Value>,
	pub action_conditions: Option<Value>,
	pub environment_conditions: Option<Value>,
	pub effect: Option<Effect>,
	pub obligations: Option<Value>,
}

/// Binds a policy to its target: a user, a role, a resource, or globally.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PolicyAssignment {
	pub id: AssignmentId,
	pub policy_id: PolicyId,
	pub assignment_type: AssignmentKind,
	/// Target row ID for user/role/resource assignments; unused for global.
	pub assignment_id: Option<i64>,
	pub assignment_name: Option<String>,
	pub is_active: bool,
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::ContextBuilder;
	use serde_json::json;

	fn policy_with_conditions(subject: Option<Value>, resource: Option<Value>) -> Policy {
		Policy {
			id: PolicyId::new(1),
			name: "test".to_string(),
			description: None,
			policy_type: PolicyKind::Conditional,
			priority: 10,
			is_active: true,
			subject_conditions: ConditionSet::decode(subject.as_ref()),
			resource_conditions: ConditionSet::decode(resource.as_ref()),
			action_conditions: ConditionSet::decode(None),
			environment_conditions: ConditionSet::decode(None),
			effect: Effect::Allow,
			obligations: None,
		}
	}

	#[test]
	fn vacuous_policy_matches_any_context() {
		let policy = policy_with_conditions(None, None);
		assert!(policy.matches(&ContextBuilder::new().build()));
		assert!(policy.matches(
			&ContextBuilder::new()
				.with_value("anything", json!("at all"))
				.build()
		));
	}

	#[test]
	fn all_groups_must_pass() {
		let policy = policy_with_conditions(
			Some(json!({"user.department": "IT"})),
			Some(json!({"resource.type": "document"})),
		);

		let full = ContextBuilder::new()
			.with_value("user.department", json!("IT"))
			.with_value("resource.type", json!("document"))
			.build();
		assert!(policy.matches(&full));

		let partial = ContextBuilder::new()
			.with_value("user.department", json!("IT"))
			.build();
		assert!(!policy.matches(&partial));
	}

	#[test]
	fn evaluation_order_breaks_ties_by_id() {
		let mut a = policy_with_conditions(None, None);
		let mut b = policy_with_conditions(None, None);
		a.priority = 10;
		b.priority = 10;
		b.id = PolicyId::new(2);
		assert!(a.evaluation_order() < b.evaluation_order());
	}

	mod properties {
		use super::*;
		use proptest::prelude::*;

		proptest! {
			#[test]
			fn first_match_has_minimal_order(priorities in proptest::collection::vec(0i64..1000, 1..16)) {
				let mut policies: Vec<Policy> = priorities
					.iter()
					.enumerate()
					.map(|(i, &priority)| {
						let mut p = policy_with_conditions(None, None);
						p.id = PolicyId::new(i as i64 + 1);
						p.priority = priority;
						p
					})
					.collect();
				policies.sort_by_key(Policy::evaluation_order);

				let context = ContextBuilder::new().build();
				let winner = policies.iter().find(|p| p.matches(&context)).unwrap();
				let min_order = policies.iter().map(Policy::evaluation_order).min().unwrap();
				prop_assert_eq!(winner.evaluation_order(), min_order);
			}
		}
	}
}
