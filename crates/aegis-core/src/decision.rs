// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization request and response shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Effect, PolicyId, UserId};

/// One authorization question: may `user_id` perform `action` on the
/// resource identified by `(resource_type, resource_id)`?
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationRequest {
	pub user_id: UserId,
	pub resource_type: String,
	pub resource_id: Option<i64>,
	pub action: String,
	/// Caller-supplied extra context; highest-precedence tier of the
	/// evaluation context.
	pub context: Option<Map<String, Value>>,
}

impl AuthorizationRequest {
	pub fn new(
		user_id: UserId,
		resource_type: impl Into<String>,
		action: impl Into<String>,
	) -> Self {
		Self {
			user_id,
			resource_type: resource_type.into(),
			resource_id: None,
			action: action.into(),
			context: None,
		}
	}

	pub fn with_resource_id(mut self, resource_id: i64) -> Self {
		self.resource_id = Some(resource_id);
		self
	}

	pub fn with_context(mut self, context: Map<String, Value>) -> Self {
		self.context = Some(context);
		self
	}
}

/// The outcome of one evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationResponse {
	pub decision: Effect,
	/// The matched policy, if any; `None` for the default deny.
	pub policy_id: Option<PolicyId>,
	pub reason: Option<String>,
	/// The matched policy's obligations, passed through uninterpreted.
	pub obligations: Option<Value>,
}

impl AuthorizationResponse {
	/// Response for a matched policy.
	pub fn matched(policy_id: PolicyId, policy_name: &str, effect: Effect, obligations: Option<Value>) -> Self {
		Self {
			decision: effect,
			policy_id: Some(policy_id),
			reason: Some(format!("policy '{policy_name}' matched")),
			obligations,
		}
	}

	/// The default-deny response when no candidate policy matched.
	pub fn default_deny() -> Self {
		Self {
			decision: Effect::Deny,
			policy_id: None,
			reason: Some("no matching policy found".to_string()),
			obligations: None,
		}
	}

	pub fn is_allowed(&self) -> bool {
		self.decision.is_allow()
	}
}
