// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy and policy assignment repository.
//!
//! Condition groups and obligations are stored as JSON TEXT and decoded
//! into the typed model on read, so callers always get policies whose
//! conditions are ready to evaluate.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use aegis_core::{
	AssignmentId, AssignmentKind, ConditionSet, Effect, NewPolicy, Policy, PolicyAssignment,
	PolicyId, PolicyKind, PolicyUpdate, UserId,
};

use crate::error::DbError;

/// Candidate selection queries for the evaluation loop.
///
/// Only user-scoped and global assignments contribute candidates; role-
/// and resource-scoped assignments are stored but never selected here.
#[async_trait]
pub trait PolicyStore: Send + Sync {
	/// Active policies assigned to this user through an active user-scoped
	/// assignment.
	async fn get_policies_for_user(&self, user_id: UserId) -> Result<Vec<Policy>, DbError>;

	/// Active policies with an active global assignment.
	async fn get_global_policies(&self) -> Result<Vec<Policy>, DbError>;
}

/// Repository for policy database operations.
#[derive(Clone)]
pub struct PolicyRepository {
	pool: SqlitePool,
}

impl PolicyRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	// =========================================================================
	// Policy CRUD
	// =========================================================================

	/// Create a policy. Condition groups are stored verbatim as JSON.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if a policy with this name exists.
	#[tracing::instrument(skip(self, policy), fields(name = %policy.name))]
	pub async fn create_policy(&self, policy: &NewPolicy) -> Result<Policy, DbError> {
		let now = Utc::now().to_rfc3339();
		let subject = encode_conditions(policy.subject_conditions.as_ref())?;
		let resource = encode_conditions(policy.resource_conditions.as_ref())?;
		let action = encode_conditions(policy.action_conditions.as_ref())?;
		let environment = encode_conditions(policy.environment_conditions.as_ref())?;
		let obligations = policy
			.obligations
			.as_ref()
			.map(serde_json::to_string)
			.transpose()?;

		let result = sqlx::query(
			r#"
			INSERT INTO policies (name, description, policy_type, priority, is_active,
				subject_conditions, resource_conditions, action_conditions, environment_conditions,
				effect, obligations, created_at, updated_at)
			VALUES (?, ?, ?, ?, 1, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(&policy.name)
		.bind(&policy.description)
		.bind(policy.policy_type.to_string())
		.bind(policy.priority)
		.bind(&subject)
		.bind(&resource)
		.bind(&action)
		.bind(&environment)
		.bind(policy.effect.to_string())
		.bind(&obligations)
		.bind(&now)
		.bind(&now)
		.execute(&self.pool)
		.await
		.map_err(|e| match &e {
			sqlx::Error::Database(db) if db.is_unique_violation() => {
				DbError::Conflict(format!("policy already exists: {}", policy.name))
			}
			_ => DbError::Sqlx(e),
		})?;

		let id = PolicyId::new(result.last_insert_rowid());
		tracing::debug!(policy_id = %id, "policy created");

		self
			.get_policy(id)
			.await?
			.ok_or_else(|| DbError::Internal(format!("policy {id} vanished after insert")))
	}

	/// Get a policy by ID.
	#[tracing::instrument(skip(self), fields(policy_id = %id))]
	pub async fn get_policy(&self, id: PolicyId) -> Result<Option<Policy>, DbError> {
		let row = sqlx::query(&format!("{POLICY_SELECT} WHERE id = ?"))
			.bind(id.as_i64())
			.fetch_optional(&self.pool)
			.await?;

		row.map(|r| row_to_policy(&r)).transpose()
	}

	/// Get a policy by its unique name.
	#[tracing::instrument(skip(self), fields(name = %name))]
	pub async fn get_policy_by_name(&self, name: &str) -> Result<Option<Policy>, DbError> {
		let row = sqlx::query(&format!("{POLICY_SELECT} WHERE name = ?"))
			.bind(name)
			.fetch_optional(&self.pool)
			.await?;

		row.map(|r| row_to_policy(&r)).transpose()
	}

	/// List all policies in evaluation order (ascending priority, then ID).
	#[tracing::instrument(skip(self))]
	pub async fn list_policies(&self) -> Result<Vec<Policy>, DbError> {
		let rows = sqlx::query(&format!("{POLICY_SELECT} ORDER BY priority, id"))
			.fetch_all(&self.pool)
			.await?;

		rows.iter().map(row_to_policy).collect()
	}

	/// Apply a partial update. `None` fields are left unchanged; condition
	/// fields, when present, replace the stored group wholesale (pass an
	/// empty object to clear one).
	#[tracing::instrument(skip(self, update), fields(policy_id = %id))]
	pub async fn update_policy(&self, id: PolicyId, update: &PolicyUpdate) -> Result<Policy, DbError> {
		let now = Utc::now().to_rfc3339();
		let subject = encode_conditions(update.subject_conditions.as_ref())?;
		let resource = encode_conditions(update.resource_conditions.as_ref())?;
		let action = encode_conditions(update.action_conditions.as_ref())?;
		let environment = encode_conditions(update.environment_conditions.as_ref())?;
		let obligations = update
			.obligations
			.as_ref()
			.map(serde_json::to_string)
			.transpose()?;

		let result = sqlx::query(
			r#"
			UPDATE policies
			SET description = COALESCE(?, description),
				priority = COALESCE(?, priority),
				is_active = COALESCE(?, is_active),
				subject_conditions = COALESCE(?, subject_conditions),
				resource_conditions = COALESCE(?, resource_conditions),
				action_conditions = COALESCE(?, action_conditions),
				environment_conditions = COALESCE(?, environment_conditions),
				effect = COALESCE(?, effect),
				obligations = COALESCE(?, obligations),
				updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(&update.description)
		.bind(update.priority)
		.bind(update.is_active.map(|b| b as i32))
		.bind(&subject)
		.bind(&resource)
		.bind(&action)
		.bind(&environment)
		.bind(update.effect.map(|e| e.to_string()))
		.bind(&obligations)
		.bind(&now)
		.bind(id.as_i64())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("policy {id}")));
		}

		self
			.get_policy(id)
			.await?
			.ok_or_else(|| DbError::Internal(format!("policy {id} vanished after update")))
	}

	/// Delete a policy. Cascades to its assignments.
	#[tracing::instrument(skip(self), fields(policy_id = %id))]
	pub async fn delete_policy(&self, id: PolicyId) -> Result<(), DbError> {
		let result = sqlx::query("DELETE FROM policies WHERE id = ?")
			.bind(id.as_i64())
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("policy {id}")));
		}
		Ok(())
	}

	// =========================================================================
	// Assignments
	// =========================================================================

	/// Bind a policy to a target. `target_id` is the user/role/resource row
	/// ID and must be `None` for global assignments.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if this exact binding already exists.
	#[tracing::instrument(skip(self), fields(policy_id = %policy_id, kind = %kind))]
	pub async fn assign_policy(
		&self,
		policy_id: PolicyId,
		kind: AssignmentKind,
		target_id: Option<i64>,
		target_name: Option<&str>,
	) -> Result<PolicyAssignment, DbError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			r#"
			INSERT INTO policy_assignments (policy_id, assignment_type, assignment_id, assignment_name, is_active, created_at)
			VALUES (?, ?, ?, ?, 1, ?)
			"#,
		)
		.bind(policy_id.as_i64())
		.bind(kind.to_string())
		.bind(target_id)
		.bind(target_name)
		.bind(&now)
		.execute(&self.pool)
		.await
		.map_err(|e| match &e {
			sqlx::Error::Database(db) if db.is_unique_violation() => {
				DbError::Conflict(format!("policy {policy_id} already assigned to this target"))
			}
			_ => DbError::Sqlx(e),
		})?;

		Ok(PolicyAssignment {
			id: AssignmentId::new(result.last_insert_rowid()),
			policy_id,
			assignment_type: kind,
			assignment_id: target_id,
			assignment_name: target_name.map(str::to_string),
			is_active: true,
		})
	}

	/// All assignments of a policy.
	#[tracing::instrument(skip(self), fields(policy_id = %policy_id))]
	pub async fn list_assignments(&self, policy_id: PolicyId) -> Result<Vec<PolicyAssignment>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, policy_id, assignment_type, assignment_id, assignment_name, is_active
			FROM policy_assignments
			WHERE policy_id = ?
			ORDER BY id
			"#,
		)
		.bind(policy_id.as_i64())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_assignment).collect()
	}

	/// Remove one assignment.
	#[tracing::instrument(skip(self), fields(assignment_id = %id))]
	pub async fn remove_assignment(&self, id: AssignmentId) -> Result<(), DbError> {
		let result = sqlx::query("DELETE FROM policy_assignments WHERE id = ?")
			.bind(id.as_i64())
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("assignment {id}")));
		}
		Ok(())
	}
}

#[async_trait]
impl PolicyStore for PolicyRepository {
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	async fn get_policies_for_user(&self, user_id: UserId) -> Result<Vec<Policy>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT p.id, p.name, p.description, p.policy_type, p.priority, p.is_active,
				p.subject_conditions, p.resource_conditions, p.action_conditions,
				p.environment_conditions, p.effect, p.obligations
			FROM policies p
			JOIN policy_assignments pa ON pa.policy_id = p.id
			WHERE pa.assignment_type = 'user'
				AND pa.assignment_id = ?
				AND pa.is_active = 1
				AND p.is_active = 1
			"#,
		)
		.bind(user_id.as_i64())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_policy).collect()
	}

	#[tracing::instrument(skip(self))]
	async fn get_global_policies(&self) -> Result<Vec<Policy>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT p.id, p.name, p.description, p.policy_type, p.priority, p.is_active,
				p.subject_conditions, p.resource_conditions, p.action_conditions,
				p.environment_conditions, p.effect, p.obligations
			FROM policies p
			JOIN policy_assignments pa ON pa.policy_id = p.id
			WHERE pa.assignment_type = 'global'
				AND pa.is_active = 1
				AND p.is_active = 1
			"#,
		)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_policy).collect()
	}
}

const POLICY_SELECT: &str = r#"
	SELECT id, name, description, policy_type, priority, is_active,
		subject_conditions, resource_conditions, action_conditions,
		environment_conditions, effect, obligations
	FROM policies
"#;

fn encode_conditions(conditions: Option<&Value>) -> Result<Option<String>, DbError> {
	conditions.map(serde_json::to_string).transpose().map_err(Into::into)
}

fn decode_conditions(raw: Option<String>) -> Result<ConditionSet, DbError> {
	let value = raw.map(|s| serde_json::from_str::<Value>(&s)).transpose()?;
	Ok(ConditionSet::decode(value.as_ref()))
}

fn row_to_policy(row: &SqliteRow) -> Result<Policy, DbError> {
	let policy_type: String = row.try_get("policy_type")?;
	let effect: String = row.try_get("effect")?;
	let obligations: Option<String> = row.try_get("obligations")?;
	let obligations = obligations
		.as_deref()
		.map(serde_json::from_str)
		.transpose()?;

	Ok(Policy {
		id: PolicyId::new(row.try_get("id")?),
		name: row.try_get("name")?,
		description: row.try_get("description")?,
		policy_type: PolicyKind::parse(&policy_type),
		priority: row.try_get("priority")?,
		is_active: row.try_get::<i64, _>("is_active")? != 0,
		subject_conditions: decode_conditions(row.try_get("subject_conditions")?)?,
		resource_conditions: decode_conditions(row.try_get("resource_conditions")?)?,
		action_conditions: decode_conditions(row.try_get("action_conditions")?)?,
		environment_conditions: decode_conditions(row.try_get("environment_conditions")?)?,
		effect: Effect::parse(&effect),
		obligations,
	})
}

fn row_to_assignment(row: &SqliteRow) -> Result<PolicyAssignment, DbError> {
	let kind: String = row.try_get("assignment_type")?;
	let kind = AssignmentKind::parse(&kind)
		.ok_or_else(|| DbError::Internal(format!("unknown assignment type: {kind}")))?;

	Ok(PolicyAssignment {
		id: AssignmentId::new(row.try_get("id")?),
		policy_id: PolicyId::new(row.try_get("policy_id")?),
		assignment_type: kind,
		assignment_id: row.try_get("assignment_id")?,
		assignment_name: row.try_get("assignment_name")?,
		is_active: row.try_get::<i64, _>("is_active")? != 0,
	})
}
