// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The authorization engine.
//!
//! `authorize` answers one question: may this user perform this action on
//! this resource, under the current context? It assembles the evaluation
//! context, walks the candidate policies in priority order, takes the
//! first match as the decision (default deny when nothing matches), and
//! records exactly one access log entry before returning.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use aegis_audit::{AccessLogEntry, AccessLogSink};
use aegis_core::{
	AuthorizationRequest, AuthorizationResponse, ContextBuilder, PermissionSet, Policy,
};
use aegis_db::{AttributeStore, PolicyStore, RbacStore, SubjectStore};

use crate::error::EngineError;

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
	/// Upper bound for one `authorize` call, storage and audit included.
	pub decision_timeout: Duration,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			decision_timeout: Duration::from_secs(5),
		}
	}
}

/// The evaluation engine, wired to its stores and the audit sink.
pub struct AuthorizationEngine {
	subjects: Arc<dyn SubjectStore>,
	attributes: Arc<dyn AttributeStore>,
	policies: Arc<dyn PolicyStore>,
	rbac: Arc<dyn RbacStore>,
	sink: Arc<dyn AccessLogSink>,
	config: EngineConfig,
}

impl AuthorizationEngine {
	pub fn new(
		subjects: Arc<dyn SubjectStore>,
		attributes: Arc<dyn AttributeStore>,
		policies: Arc<dyn PolicyStore>,
		rbac: Arc<dyn RbacStore>,
		sink: Arc<dyn AccessLogSink>,
	) -> Self {
		Self::with_config(subjects, attributes, policies, rbac, sink, EngineConfig::default())
	}

	pub fn with_config(
		subjects: Arc<dyn SubjectStore>,
		attributes: Arc<dyn AttributeStore>,
		policies: Arc<dyn PolicyStore>,
		rbac: Arc<dyn RbacStore>,
		sink: Arc<dyn AccessLogSink>,
		config: EngineConfig,
	) -> Self {
		Self {
			subjects,
			attributes,
			policies,
			rbac,
			sink,
			config,
		}
	}

	/// Evaluate one authorization request.
	///
	/// The access log write is part of the evaluation: if it fails, the
	/// caller gets an error, not a decision.
	#[tracing::instrument(skip(self, request), fields(user_id = %request.user_id, resource_type = %request.resource_type, action = %request.action))]
	pub async fn authorize(
		&self,
		request: &AuthorizationRequest,
	) -> Result<AuthorizationResponse, EngineError> {
		let timeout = self.config.decision_timeout;
		tokio::time::timeout(timeout, self.evaluate(request))
			.await
			.map_err(|_| EngineError::Timeout(timeout))?
	}

	async fn evaluate(
		&self,
		request: &AuthorizationRequest,
	) -> Result<AuthorizationResponse, EngineError> {
		let now = Utc::now();
		let subject = self.subjects.get_subject(request.user_id).await?;

		let mut builder = ContextBuilder::new();
		if let Some(subject) = &subject {
			let attributes = self.attributes.get_subject_attributes(subject.id).await?;
			builder = builder.with_subject_attributes(attributes).with_subject(subject);
		} else {
			tracing::warn!(user_id = %request.user_id, "unknown subject, evaluating on request fields only");
		}
		builder = builder.with_request(
			&request.resource_type,
			request.resource_id,
			&request.action,
			now,
		);
		if let Some(extras) = &request.context {
			builder = builder.with_extras(extras);
		}
		let context = builder.build();

		let candidates = self.candidate_policies(request).await?;
		let matched = candidates.iter().find(|p| p.matches(&context));

		let response = match matched {
			Some(policy) => {
				tracing::debug!(policy_id = %policy.id, name = %policy.name, effect = %policy.effect, "policy matched");
				AuthorizationResponse::matched(
					policy.id,
					&policy.name,
					policy.effect,
					policy.obligations.clone(),
				)
			}
			None => {
				tracing::debug!(candidates = candidates.len(), "no policy matched, default deny");
				AuthorizationResponse::default_deny()
			}
		};

		let mut entry = AccessLogEntry::builder(
			request.resource_type.clone(),
			request.action.clone(),
			response.decision,
		)
		.user(request.user_id)
		.context(context.snapshot());
		if let Some(resource_id) = request.resource_id {
			entry = entry.resource_id(resource_id);
		}
		if let Some(policy_id) = response.policy_id {
			entry = entry.policy(policy_id);
		}
		if let Some(reason) = &response.reason {
			entry = entry.reason(reason.clone());
		}
		self.sink.record(&entry.build()).await?;

		Ok(response)
	}

	/// Candidate policies for this request: user-assigned plus global,
	/// de-duplicated by ID, in ascending `(priority, id)` order.
	async fn candidate_policies(
		&self,
		request: &AuthorizationRequest,
	) -> Result<Vec<Policy>, EngineError> {
		let mut candidates = self.policies.get_policies_for_user(request.user_id).await?;
		candidates.extend(self.policies.get_global_policies().await?);

		candidates.sort_by_key(Policy::evaluation_order);
		candidates.dedup_by_key(|p| p.id);
		Ok(candidates)
	}

	/// Coarse RBAC check: does the user hold a permission for this
	/// `(resource, action)` pair through any assigned role?
	///
	/// No policy conditions are consulted and no access log entry is
	/// written; this is the role-membership question only.
	#[tracing::instrument(skip(self), fields(user_id = %user_id, resource = %resource, action = %action))]
	pub async fn has_permission(
		&self,
		user_id: aegis_core::UserId,
		resource: &str,
		action: &str,
	) -> Result<bool, EngineError> {
		let permissions = self.rbac.get_user_permissions(user_id).await?;
		let set = PermissionSet::from_permissions(permissions);
		Ok(set.allows(resource, action))
	}
}
