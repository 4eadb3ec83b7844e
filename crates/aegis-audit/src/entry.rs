// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The access log record and its builder.
//!
//! Every authorization evaluation produces exactly one [`AccessLogEntry`],
//! whether a policy matched or the engine fell through to the default
//! deny. The entry captures the question asked, the answer given, and a
//! snapshot of the evaluation context the answer was derived from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use aegis_core::{Effect, PolicyId, UserId};

/// One row in the access log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogEntry {
	/// When the evaluation happened.
	pub timestamp: DateTime<Utc>,
	/// The subject the question was asked about, if known.
	pub user_id: Option<UserId>,
	/// The type of resource the action targeted.
	pub resource_type: String,
	/// The ID of the resource, if the request named one.
	pub resource_id: Option<i64>,
	/// The action that was requested.
	pub action: String,
	/// The decision that was returned to the caller.
	pub decision: Effect,
	/// The policy that produced the decision; `None` for the default deny.
	pub policy_id: Option<PolicyId>,
	/// Why the decision came out the way it did.
	pub reason: Option<String>,
	/// Snapshot of the full evaluation context at decision time.
	pub context: Value,
	/// IP address of the request origin.
	pub ip_address: Option<String>,
	/// User agent string from the request.
	pub user_agent: Option<String>,
}

impl AccessLogEntry {
	/// Create a new builder for a decision on `action` against `resource_type`.
	pub fn builder(
		resource_type: impl Into<String>,
		action: impl Into<String>,
		decision: Effect,
	) -> AccessLogBuilder {
		AccessLogBuilder::new(resource_type, action, decision)
	}
}

/// Builder for constructing access log entries with a fluent API.
#[derive(Debug, Clone)]
pub struct AccessLogBuilder {
	user_id: Option<UserId>,
	resource_type: String,
	resource_id: Option<i64>,
	action: String,
	decision: Effect,
	policy_id: Option<PolicyId>,
	reason: Option<String>,
	context: Value,
	ip_address: Option<String>,
	user_agent: Option<String>,
}

impl AccessLogBuilder {
	pub fn new(
		resource_type: impl Into<String>,
		action: impl Into<String>,
		decision: Effect,
	) -> Self {
		Self {
			user_id: None,
			resource_type: resource_type.into(),
			resource_id: None,
			action: action.into(),
			decision,
			policy_id: None,
			reason: None,
			context: Value::Null,
			ip_address: None,
			user_agent: None,
		}
	}

	/// Set the subject the decision was made about.
	pub fn user(mut self, user_id: UserId) -> Self {
		self.user_id = Some(user_id);
		self
	}

	/// Set the specific resource ID, where the request named one.
	pub fn resource_id(mut self, resource_id: i64) -> Self {
		self.resource_id = Some(resource_id);
		self
	}

	/// Set the policy that produced the decision.
	pub fn policy(mut self, policy_id: PolicyId) -> Self {
		self.policy_id = Some(policy_id);
		self
	}

	/// Set the human-readable reason for the decision.
	pub fn reason(mut self, reason: impl Into<String>) -> Self {
		self.reason = Some(reason.into());
		self
	}

	/// Attach the evaluation context snapshot.
	pub fn context(mut self, context: Value) -> Self {
		self.context = context;
		self
	}

	/// Set the IP address of the request origin.
	pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
		self.ip_address = Some(ip.into());
		self
	}

	/// Set the user agent string from the request.
	pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
		self.user_agent = Some(ua.into());
		self
	}

	/// Finalize the entry, stamping it with the current time.
	pub fn build(self) -> AccessLogEntry {
		AccessLogEntry {
			timestamp: Utc::now(),
			user_id: self.user_id,
			resource_type: self.resource_type,
			resource_id: self.resource_id,
			action: self.action,
			decision: self.decision,
			policy_id: self.policy_id,
			reason: self.reason,
			context: self.context,
			ip_address: self.ip_address,
			user_agent: self.user_agent,
		}
	}
}
