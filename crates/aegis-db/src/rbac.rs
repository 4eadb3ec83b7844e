// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Role and permission repository.
//!
//! This module provides database access for RBAC management including:
//! - Role and permission CRUD
//! - Role assignment to users (replace semantics)
//! - Permission grants to roles (replace semantics)
//! - Resolution of a user's effective permission union

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use aegis_core::{NewPermission, NewRole, Permission, PermissionId, Role, RoleId, UserId};

use crate::error::DbError;

/// The queries the engine needs for permission checks.
#[async_trait]
pub trait RbacStore: Send + Sync {
	/// All permissions a user holds through role membership, de-duplicated.
	async fn get_user_permissions(&self, user_id: UserId) -> Result<Vec<Permission>, DbError>;
}

/// Repository for role and permission database operations.
#[derive(Clone)]
pub struct RoleRepository {
	pool: SqlitePool,
}

impl RoleRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	// =========================================================================
	// Role CRUD
	// =========================================================================

	/// Create a role.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if a role with this name already exists.
	#[tracing::instrument(skip(self, role), fields(name = %role.name))]
	pub async fn create_role(&self, role: &NewRole) -> Result<Role, DbError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			r#"
			INSERT INTO roles (name, display_name, description, is_active, is_system, created_at, updated_at)
			VALUES (?, ?, ?, 1, ?, ?, ?)
			"#,
		)
		.bind(&role.name)
		.bind(&role.display_name)
		.bind(&role.description)
		.bind(role.is_system as i32)
		.bind(&now)
		.bind(&now)
		.execute(&self.pool)
		.await
		.map_err(|e| match &e {
			sqlx::Error::Database(db) if db.is_unique_violation() => {
				DbError::Conflict(format!("role already exists: {}", role.name))
			}
			_ => DbError::Sqlx(e),
		})?;

		let id = RoleId::new(result.last_insert_rowid());
		tracing::debug!(role_id = %id, "role created");

		Ok(Role {
			id,
			name: role.name.clone(),
			display_name: role.display_name.clone(),
			description: role.description.clone(),
			is_active: true,
			is_system: role.is_system,
		})
	}

	/// Get a role by ID.
	#[tracing::instrument(skip(self), fields(role_id = %id))]
	pub async fn get_role(&self, id: RoleId) -> Result<Option<Role>, DbError> {
		let row = sqlx::query(
			"SELECT id, name, display_name, description, is_active, is_system FROM roles WHERE id = ?",
		)
		.bind(id.as_i64())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_role(&r)).transpose()
	}

	/// Get a role by its unique name.
	#[tracing::instrument(skip(self), fields(name = %name))]
	pub async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>, DbError> {
		let row = sqlx::query(
			"SELECT id, name, display_name, description, is_active, is_system FROM roles WHERE name = ?",
		)
		.bind(name)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_role(&r)).transpose()
	}

	/// List all roles, ordered by name.
	#[tracing::instrument(skip(self))]
	pub async fn list_roles(&self) -> Result<Vec<Role>, DbError> {
		let rows = sqlx::query(
			"SELECT id, name, display_name, description, is_active, is_system FROM roles ORDER BY name",
		)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_role).collect()
	}

	/// Enable or disable a role.
	#[tracing::instrument(skip(self), fields(role_id = %id, is_active = is_active))]
	pub async fn set_role_active(&self, id: RoleId, is_active: bool) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query("UPDATE roles SET is_active = ?, updated_at = ? WHERE id = ?")
			.bind(is_active as i32)
			.bind(&now)
			.bind(id.as_i64())
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("role {id}")));
		}

		tracing::debug!(role_id = %id, "role activation updated");
		Ok(())
	}

	/// Delete a role. Cascades to its user assignments and permission grants.
	///
	/// # Errors
	/// Returns `DbError::Conflict` for system roles, which cannot be deleted.
	#[tracing::instrument(skip(self), fields(role_id = %id))]
	pub async fn delete_role(&self, id: RoleId) -> Result<(), DbError> {
		let role = self
			.get_role(id)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("role {id}")))?;

		if role.is_system {
			return Err(DbError::Conflict(format!(
				"system role cannot be deleted: {}",
				role.name
			)));
		}

		sqlx::query("DELETE FROM roles WHERE id = ?")
			.bind(id.as_i64())
			.execute(&self.pool)
			.await?;

		tracing::debug!(role_id = %id, name = %role.name, "role deleted");
		Ok(())
	}

	// =========================================================================
	// Permission CRUD
	// =========================================================================

	/// Create a permission.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if a permission with this name exists.
	#[tracing::instrument(skip(self, permission), fields(name = %permission.name))]
	pub async fn create_permission(&self, permission: &NewPermission) -> Result<Permission, DbError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			r#"
			INSERT INTO permissions (name, display_name, description, resource, action, is_active, created_at)
			VALUES (?, ?, ?, ?, ?, 1, ?)
			"#,
		)
		.bind(&permission.name)
		.bind(&permission.display_name)
		.bind(&permission.description)
		.bind(&permission.resource)
		.bind(&permission.action)
		.bind(&now)
		.execute(&self.pool)
		.await
		.map_err(|e| match &e {
			sqlx::Error::Database(db) if db.is_unique_violation() => {
				DbError::Conflict(format!("permission already exists: {}", permission.name))
			}
			_ => DbError::Sqlx(e),
		})?;

		Ok(Permission {
			id: PermissionId::new(result.last_insert_rowid()),
			name: permission.name.clone(),
			display_name: permission.display_name.clone(),
			description: permission.description.clone(),
			resource: permission.resource.clone(),
			action: permission.action.clone(),
			is_active: true,
		})
	}

	/// Get a permission by its unique name.
	#[tracing::instrument(skip(self), fields(name = %name))]
	pub async fn get_permission_by_name(&self, name: &str) -> Result<Option<Permission>, DbError> {
		let row = sqlx::query(
			"SELECT id, name, display_name, description, resource, action, is_active FROM permissions WHERE name = ?",
		)
		.bind(name)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_permission(&r)).transpose()
	}

	/// List all permissions, ordered by resource then action.
	#[tracing::instrument(skip(self))]
	pub async fn list_permissions(&self) -> Result<Vec<Permission>, DbError> {
		let rows = sqlx::query(
			"SELECT id, name, display_name, description, resource, action, is_active FROM permissions ORDER BY resource, action",
		)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_permission).collect()
	}

	// =========================================================================
	// Assignments
	// =========================================================================

	/// Replace a user's role set with the given roles.
	///
	/// Runs in a transaction: the previous assignments are removed and the
	/// new set inserted atomically. An empty slice clears all roles.
	#[tracing::instrument(skip(self, role_ids), fields(user_id = %user_id, count = role_ids.len()))]
	pub async fn assign_roles_to_user(
		&self,
		user_id: UserId,
		role_ids: &[RoleId],
	) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		let mut tx = self.pool.begin().await?;

		sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
			.bind(user_id.as_i64())
			.execute(&mut *tx)
			.await?;

		for role_id in role_ids {
			sqlx::query("INSERT INTO user_roles (user_id, role_id, assigned_at) VALUES (?, ?, ?)")
				.bind(user_id.as_i64())
				.bind(role_id.as_i64())
				.bind(&now)
				.execute(&mut *tx)
				.await?;
		}

		tx.commit().await?;
		tracing::debug!(user_id = %user_id, "user roles replaced");
		Ok(())
	}

	/// Roles currently assigned to a user, ordered by name.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn get_user_roles(&self, user_id: UserId) -> Result<Vec<Role>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT r.id, r.name, r.display_name, r.description, r.is_active, r.is_system
			FROM roles r
			JOIN user_roles ur ON ur.role_id = r.id
			WHERE ur.user_id = ?
			ORDER BY r.name
			"#,
		)
		.bind(user_id.as_i64())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_role).collect()
	}

	/// Remove every role assignment a user holds.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn remove_user_roles(&self, user_id: UserId) -> Result<u64, DbError> {
		let result = sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
			.bind(user_id.as_i64())
			.execute(&self.pool)
			.await?;

		tracing::debug!(user_id = %user_id, removed = result.rows_affected(), "user roles removed");
		Ok(result.rows_affected())
	}

	/// Replace a role's permission grants with the given permissions.
	#[tracing::instrument(skip(self, permission_ids), fields(role_id = %role_id, count = permission_ids.len()))]
	pub async fn assign_permissions_to_role(
		&self,
		role_id: RoleId,
		permission_ids: &[PermissionId],
	) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		let mut tx = self.pool.begin().await?;

		sqlx::query("DELETE FROM role_permissions WHERE role_id = ?")
			.bind(role_id.as_i64())
			.execute(&mut *tx)
			.await?;

		for permission_id in permission_ids {
			sqlx::query(
				"INSERT INTO role_permissions (role_id, permission_id, granted_at) VALUES (?, ?, ?)",
			)
			.bind(role_id.as_i64())
			.bind(permission_id.as_i64())
			.bind(&now)
			.execute(&mut *tx)
			.await?;
		}

		tx.commit().await?;
		tracing::debug!(role_id = %role_id, "role permissions replaced");
		Ok(())
	}

	/// Permissions granted to a role, ordered by resource then action.
	#[tracing::instrument(skip(self), fields(role_id = %role_id))]
	pub async fn get_role_permissions(&self, role_id: RoleId) -> Result<Vec<Permission>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT p.id, p.name, p.display_name, p.description, p.resource, p.action, p.is_active
			FROM permissions p
			JOIN role_permissions rp ON rp.permission_id = p.id
			WHERE rp.role_id = ?
			ORDER BY p.resource, p.action
			"#,
		)
		.bind(role_id.as_i64())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_permission).collect()
	}

	/// A user's effective permission union across all assigned roles.
	///
	/// Duplicates from overlapping roles collapse via DISTINCT.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn get_user_permissions(&self, user_id: UserId) -> Result<Vec<Permission>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT DISTINCT p.id, p.name, p.display_name, p.description, p.resource, p.action, p.is_active
			FROM permissions p
			JOIN role_permissions rp ON rp.permission_id = p.id
			JOIN user_roles ur ON ur.role_id = rp.role_id
			WHERE ur.user_id = ?
			ORDER BY p.id
			"#,
		)
		.bind(user_id.as_i64())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_permission).collect()
	}
}

#[async_trait]
impl RbacStore for RoleRepository {
	async fn get_user_permissions(&self, user_id: UserId) -> Result<Vec<Permission>, DbError> {
		RoleRepository::get_user_permissions(self, user_id).await
	}
}

fn row_to_role(row: &SqliteRow) -> Result<Role, DbError> {
	Ok(Role {
		id: RoleId::new(row.try_get("id")?),
		name: row.try_get("name")?,
		display_name: row.try_get("display_name")?,
		description: row.try_get("description")?,
		is_active: row.try_get::<i64, _>("is_active")? != 0,
		is_system: row.try_get::<i64, _>("is_system")? != 0,
	})
}

fn row_to_permission(row: &SqliteRow) -> Result<Permission, DbError> {
	Ok(Permission {
		id: PermissionId::new(row.try_get("id")?),
		name: row.try_get("name")?,
		display_name: row.try_get("display_name")?,
		description: row.try_get("description")?,
		resource: row.try_get("resource")?,
		action: row.try_get("action")?,
		is_active: row.try_get::<i64, _>("is_active")? != 0,
	})
}
