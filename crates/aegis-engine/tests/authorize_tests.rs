// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Integration tests for the full evaluation flow.
//!
//! Tests cover:
//! - Default deny when no policy matches
//! - First-match-wins ordering across user and global candidates
//! - Context precedence (attribute store, subject fields, request, extras)
//! - Unknown subjects degrading to request-field evaluation
//! - The one-access-log-row-per-evaluation contract

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tempfile::TempDir;

use aegis_audit::{AccessLogEntry, AccessLogSink, AuditError, SqliteAccessLogSink};
use aegis_core::{
	AssignmentKind, AuthorizationRequest, Effect, NewPolicy, NewSubject, PolicyKind, Subject,
	UserId,
};
use aegis_db::{
	create_pool, create_schema, AccessLogRepository, AttributeRepository, PolicyRepository,
	RoleRepository, SubjectRepository,
};
use aegis_engine::AuthorizationEngine;

struct TestHarness {
	engine: AuthorizationEngine,
	subjects: SubjectRepository,
	attributes: AttributeRepository,
	policies: PolicyRepository,
	access_logs: AccessLogRepository,
	_dir: TempDir,
}

async fn setup() -> TestHarness {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();

	let dir = TempDir::new().unwrap();
	let db_path = dir.path().join("authz_test.db");
	let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
	let pool = create_pool(&db_url).await.unwrap();
	create_schema(&pool).await.unwrap();

	let subjects = SubjectRepository::new(pool.clone());
	let attributes = AttributeRepository::new(pool.clone());
	let policies = PolicyRepository::new(pool.clone());
	let roles = RoleRepository::new(pool.clone());
	let sink = SqliteAccessLogSink::new(pool.clone());

	let engine = AuthorizationEngine::new(
		Arc::new(subjects.clone()),
		Arc::new(attributes.clone()),
		Arc::new(policies.clone()),
		Arc::new(roles),
		Arc::new(sink),
	);

	TestHarness {
		engine,
		subjects,
		attributes,
		policies,
		access_logs: AccessLogRepository::new(pool),
		_dir: dir,
	}
}

async fn create_subject(harness: &TestHarness, email: &str, department: Option<&str>) -> Subject {
	harness
		.subjects
		.create_subject(&NewSubject {
			email: email.to_string(),
			name: None,
			department: department.map(str::to_string),
			position: None,
			location: None,
			clearance_level: None,
		})
		.await
		.unwrap()
}

fn policy(name: &str, priority: i64, effect: Effect) -> NewPolicy {
	NewPolicy {
		name: name.to_string(),
		description: None,
		policy_type: PolicyKind::Conditional,
		priority,
		subject_conditions: None,
		resource_conditions: None,
		action_conditions: None,
		environment_conditions: None,
		effect,
		obligations: None,
	}
}

async fn create_global_policy(harness: &TestHarness, new_policy: &NewPolicy) -> aegis_core::Policy {
	let created = harness.policies.create_policy(new_policy).await.unwrap();
	harness
		.policies
		.assign_policy(created.id, AssignmentKind::Global, None, None)
		.await
		.unwrap();
	created
}

// ============================================================================
// Decisions
// ============================================================================

#[tokio::test]
async fn no_policies_means_default_deny() {
	let harness = setup().await;
	let subject = create_subject(&harness, "a@example.com", None).await;

	let response = harness
		.engine
		.authorize(&AuthorizationRequest::new(subject.id, "document", "read"))
		.await
		.unwrap();

	assert_eq!(response.decision, Effect::Deny);
	assert!(response.policy_id.is_none());
	assert_eq!(response.reason.as_deref(), Some("no matching policy found"));
}

#[tokio::test]
async fn unconditional_global_allow_matches_everything() {
	let harness = setup().await;
	let subject = create_subject(&harness, "a@example.com", None).await;
	let created = create_global_policy(&harness, &policy("allow-all", 100, Effect::Allow)).await;

	let response = harness
		.engine
		.authorize(&AuthorizationRequest::new(subject.id, "document", "read"))
		.await
		.unwrap();

	assert_eq!(response.decision, Effect::Allow);
	assert_eq!(response.policy_id, Some(created.id));
	assert_eq!(
		response.reason.as_deref(),
		Some("policy 'allow-all' matched")
	);
}

#[tokio::test]
async fn lowest_priority_match_wins() {
	let harness = setup().await;
	let subject = create_subject(&harness, "a@example.com", None).await;
	create_global_policy(&harness, &policy("late-allow", 50, Effect::Allow)).await;
	let deny = create_global_policy(&harness, &policy("early-deny", 5, Effect::Deny)).await;

	let response = harness
		.engine
		.authorize(&AuthorizationRequest::new(subject.id, "document", "read"))
		.await
		.unwrap();

	assert_eq!(response.decision, Effect::Deny);
	assert_eq!(response.policy_id, Some(deny.id));
}

#[tokio::test]
async fn equal_priority_ties_break_on_creation_order() {
	let harness = setup().await;
	let subject = create_subject(&harness, "a@example.com", None).await;
	let first = create_global_policy(&harness, &policy("first", 10, Effect::Allow)).await;
	create_global_policy(&harness, &policy("second", 10, Effect::Deny)).await;

	let response = harness
		.engine
		.authorize(&AuthorizationRequest::new(subject.id, "document", "read"))
		.await
		.unwrap();

	assert_eq!(response.policy_id, Some(first.id));
	assert_eq!(response.decision, Effect::Allow);
}

#[tokio::test]
async fn user_assigned_policies_compete_with_global_on_priority() {
	let harness = setup().await;
	let subject = create_subject(&harness, "a@example.com", None).await;

	create_global_policy(&harness, &policy("global-allow", 20, Effect::Allow)).await;
	let personal = harness
		.policies
		.create_policy(&policy("personal-deny", 10, Effect::Deny))
		.await
		.unwrap();
	harness
		.policies
		.assign_policy(
			personal.id,
			AssignmentKind::User,
			Some(subject.id.as_i64()),
			Some("a@example.com"),
		)
		.await
		.unwrap();

	let response = harness
		.engine
		.authorize(&AuthorizationRequest::new(subject.id, "document", "read"))
		.await
		.unwrap();

	assert_eq!(response.policy_id, Some(personal.id));
	assert_eq!(response.decision, Effect::Deny);
}

#[tokio::test]
async fn matched_policy_passes_obligations_through() {
	let harness = setup().await;
	let subject = create_subject(&harness, "a@example.com", None).await;

	let mut with_obligations = policy("watermark", 10, Effect::Allow);
	with_obligations.obligations = Some(json!({ "watermark": true }));
	create_global_policy(&harness, &with_obligations).await;

	let response = harness
		.engine
		.authorize(&AuthorizationRequest::new(subject.id, "document", "read"))
		.await
		.unwrap();

	assert_eq!(response.obligations, Some(json!({ "watermark": true })));
}

// ============================================================================
// Context assembly
// ============================================================================

#[tokio::test]
async fn policy_conditions_see_subject_fields() {
	let harness = setup().await;
	let engineer = create_subject(&harness, "eng@example.com", Some("engineering")).await;
	let accountant = create_subject(&harness, "fin@example.com", Some("finance")).await;

	let mut dept_policy = policy("engineering-only", 10, Effect::Allow);
	dept_policy.subject_conditions = Some(json!({ "user.department": "engineering" }));
	create_global_policy(&harness, &dept_policy).await;

	let allowed = harness
		.engine
		.authorize(&AuthorizationRequest::new(engineer.id, "document", "read"))
		.await
		.unwrap();
	let denied = harness
		.engine
		.authorize(&AuthorizationRequest::new(accountant.id, "document", "read"))
		.await
		.unwrap();

	assert_eq!(allowed.decision, Effect::Allow);
	assert_eq!(denied.decision, Effect::Deny);
}

#[tokio::test]
async fn stored_attributes_feed_conditions_but_core_fields_override() {
	let harness = setup().await;
	let subject = create_subject(&harness, "a@example.com", Some("engineering")).await;

	harness
		.attributes
		.create_definition(&aegis_core::NewAttributeDefinition {
			name: "user.team".to_string(),
			display_name: "Team".to_string(),
			description: None,
			attribute_type: aegis_core::AttributeKind::String,
			data_type: aegis_core::AttributeScope::Subject,
			is_required: false,
			is_multivalued: false,
			allowed_values: None,
			default_value: None,
		})
		.await
		.unwrap();
	harness
		.attributes
		.set_subject_attribute(subject.id, "user.team", "platform")
		.await
		.unwrap();

	// The store also carries a stale department; the core field wins.
	harness
		.attributes
		.create_definition(&aegis_core::NewAttributeDefinition {
			name: "user.department".to_string(),
			display_name: "Department".to_string(),
			description: None,
			attribute_type: aegis_core::AttributeKind::String,
			data_type: aegis_core::AttributeScope::Subject,
			is_required: false,
			is_multivalued: false,
			allowed_values: None,
			default_value: None,
		})
		.await
		.unwrap();
	harness
		.attributes
		.set_subject_attribute(subject.id, "user.department", "sales")
		.await
		.unwrap();

	let mut team_policy = policy("platform-team", 10, Effect::Allow);
	team_policy.subject_conditions = Some(json!({
		"user.team": "platform",
		"user.department": "engineering",
	}));
	create_global_policy(&harness, &team_policy).await;

	let response = harness
		.engine
		.authorize(&AuthorizationRequest::new(subject.id, "document", "read"))
		.await
		.unwrap();
	assert_eq!(response.decision, Effect::Allow);
}

#[tokio::test]
async fn caller_extras_take_highest_precedence() {
	let harness = setup().await;
	let subject = create_subject(&harness, "a@example.com", Some("engineering")).await;

	let mut dept_policy = policy("override-check", 10, Effect::Allow);
	dept_policy.subject_conditions = Some(json!({ "user.department": "emergency" }));
	create_global_policy(&harness, &dept_policy).await;

	let mut extras = Map::new();
	extras.insert("user.department".to_string(), Value::String("emergency".to_string()));

	let response = harness
		.engine
		.authorize(
			&AuthorizationRequest::new(subject.id, "document", "read").with_context(extras),
		)
		.await
		.unwrap();
	assert_eq!(response.decision, Effect::Allow);
}

#[tokio::test]
async fn condition_on_missing_key_fails_closed() {
	let harness = setup().await;
	let subject = create_subject(&harness, "a@example.com", None).await;

	let mut env_policy = policy("needs-env", 10, Effect::Allow);
	env_policy.environment_conditions = Some(json!({ "env.ip_address": "10.0.0.1" }));
	create_global_policy(&harness, &env_policy).await;

	let response = harness
		.engine
		.authorize(&AuthorizationRequest::new(subject.id, "document", "read"))
		.await
		.unwrap();
	assert_eq!(response.decision, Effect::Deny);
}

#[tokio::test]
async fn unknown_subject_still_evaluates_request_fields() {
	let harness = setup().await;

	let mut action_policy = policy("read-anything", 10, Effect::Allow);
	action_policy.action_conditions = Some(json!({ "action": "read" }));
	create_global_policy(&harness, &action_policy).await;

	let mut dept_policy = policy("needs-subject", 5, Effect::Allow);
	dept_policy.subject_conditions = Some(json!({ "user.department": "engineering" }));
	create_global_policy(&harness, &dept_policy).await;

	let ghost = UserId::new(404);
	let response = harness
		.engine
		.authorize(&AuthorizationRequest::new(ghost, "document", "read"))
		.await
		.unwrap();

	assert_eq!(response.decision, Effect::Allow);
	assert_eq!(
		response.reason.as_deref(),
		Some("policy 'read-anything' matched")
	);
}

// ============================================================================
// Access log contract
// ============================================================================

#[tokio::test]
async fn every_evaluation_writes_exactly_one_log_row() {
	let harness = setup().await;
	let subject = create_subject(&harness, "a@example.com", None).await;
	let allow = create_global_policy(&harness, &policy("allow-all", 10, Effect::Allow)).await;

	harness
		.engine
		.authorize(&AuthorizationRequest::new(subject.id, "document", "read").with_resource_id(7))
		.await
		.unwrap();
	harness
		.engine
		.authorize(&AuthorizationRequest::new(UserId::new(404), "report", "delete"))
		.await
		.unwrap();

	assert_eq!(harness.access_logs.count().await.unwrap(), 2);

	let rows = harness.access_logs.list_recent(None, 10).await.unwrap();
	// Newest first: the unknown-subject evaluation is rows[0].
	assert_eq!(rows[0].resource_type, "report");
	assert_eq!(rows[0].action, "delete");
	assert_eq!(rows[0].user_id, Some(UserId::new(404)));

	assert_eq!(rows[1].decision, Effect::Allow);
	assert_eq!(rows[1].policy_id, Some(allow.id));
	assert_eq!(rows[1].resource_id, Some(7));
	let context = rows[1].context.as_ref().unwrap();
	assert_eq!(context["resource.type"], json!("document"));
	assert_eq!(context["action"], json!("read"));
}

#[tokio::test]
async fn default_deny_is_logged_with_no_policy() {
	let harness = setup().await;
	let subject = create_subject(&harness, "a@example.com", None).await;

	harness
		.engine
		.authorize(&AuthorizationRequest::new(subject.id, "document", "read"))
		.await
		.unwrap();

	let rows = harness.access_logs.list_recent(Some(subject.id), 10).await.unwrap();
	assert_eq!(rows.len(), 1);
	assert_eq!(rows[0].decision, Effect::Deny);
	assert!(rows[0].policy_id.is_none());
	assert_eq!(rows[0].reason.as_deref(), Some("no matching policy found"));
}

#[tokio::test]
async fn failed_log_write_fails_the_evaluation() {
	struct FailingSink;

	#[async_trait::async_trait]
	impl AccessLogSink for FailingSink {
		fn name(&self) -> &str {
			"failing"
		}

		async fn record(&self, _entry: &AccessLogEntry) -> Result<(), AuditError> {
			Err(AuditError::Sink("disk full".to_string()))
		}
	}

	let harness = setup().await;
	let subject = create_subject(&harness, "a@example.com", None).await;

	let dir = TempDir::new().unwrap();
	let db_url = format!("sqlite:{}?mode=rwc", dir.path().join("x.db").display());
	let pool = create_pool(&db_url).await.unwrap();
	create_schema(&pool).await.unwrap();

	let engine = AuthorizationEngine::new(
		Arc::new(harness.subjects.clone()),
		Arc::new(harness.attributes.clone()),
		Arc::new(harness.policies.clone()),
		Arc::new(RoleRepository::new(pool)),
		Arc::new(FailingSink),
	);

	let err = engine
		.authorize(&AuthorizationRequest::new(subject.id, "document", "read"))
		.await
		.unwrap_err();
	assert!(matches!(err, aegis_engine::EngineError::Audit(_)));
}
