// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schema creation for the authorization tables.
//!
//! All timestamps are RFC 3339 TEXT, booleans are INTEGER 0/1, and JSON
//! payloads (condition groups, obligations, context snapshots) are stored
//! as TEXT and decoded on read.

use sqlx::SqlitePool;

use crate::error::DbError;

/// Create every table the engine needs, idempotently.
#[tracing::instrument(skip(pool))]
pub async fn create_schema(pool: &SqlitePool) -> Result<(), DbError> {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS users (
			id INTEGER PRIMARY KEY AUTOINCREMENT,
			email TEXT NOT NULL UNIQUE,
			name TEXT,
			department TEXT,
			position TEXT,
			location TEXT,
			clearance_level TEXT,
			is_active INTEGER NOT NULL DEFAULT 1,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS roles (
			id INTEGER PRIMARY KEY AUTOINCREMENT,
			name TEXT NOT NULL UNIQUE,
			display_name TEXT NOT NULL,
			description TEXT,
			is_active INTEGER NOT NULL DEFAULT 1,
			is_system INTEGER NOT NULL DEFAULT 0,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS permissions (
			id INTEGER PRIMARY KEY AUTOINCREMENT,
			name TEXT NOT NULL UNIQUE,
			display_name TEXT NOT NULL,
			description TEXT,
			resource TEXT NOT NULL,
			action TEXT NOT NULL,
			is_active INTEGER NOT NULL DEFAULT 1,
			created_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS user_roles (
			user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
			role_id INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
			assigned_at TEXT NOT NULL,
			PRIMARY KEY (user_id, role_id)
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS role_permissions (
			role_id INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
			permission_id INTEGER NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
			granted_at TEXT NOT NULL,
			PRIMARY KEY (role_id, permission_id)
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS attributes (
			id INTEGER PRIMARY KEY AUTOINCREMENT,
			name TEXT NOT NULL UNIQUE,
			display_name TEXT NOT NULL,
			description TEXT,
			attribute_type TEXT NOT NULL,
			data_type TEXT NOT NULL,
			is_required INTEGER NOT NULL DEFAULT 0,
			is_multivalued INTEGER NOT NULL DEFAULT 0,
			allowed_values TEXT,
			default_value TEXT,
			created_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS user_attributes (
			id INTEGER PRIMARY KEY AUTOINCREMENT,
			user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
			attribute_id INTEGER NOT NULL REFERENCES attributes(id) ON DELETE CASCADE,
			value TEXT NOT NULL,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL,
			UNIQUE(user_id, attribute_id)
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS resource_attributes (
			id INTEGER PRIMARY KEY AUTOINCREMENT,
			resource_type TEXT NOT NULL,
			resource_id INTEGER NOT NULL,
			attribute_id INTEGER NOT NULL REFERENCES attributes(id) ON DELETE CASCADE,
			value TEXT NOT NULL,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL,
			UNIQUE(resource_type, resource_id, attribute_id)
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS policies (
			id INTEGER PRIMARY KEY AUTOINCREMENT,
			name TEXT NOT NULL UNIQUE,
			description TEXT,
			policy_type TEXT NOT NULL,
			priority INTEGER NOT NULL DEFAULT 100,
			is_active INTEGER NOT NULL DEFAULT 1,
			subject_conditions TEXT,
			resource_conditions TEXT,
			action_conditions TEXT,
			environment_conditions TEXT,
			effect TEXT NOT NULL,
			obligations TEXT,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS policy_assignments (
			id INTEGER PRIMARY KEY AUTOINCREMENT,
			policy_id INTEGER NOT NULL REFERENCES policies(id) ON DELETE CASCADE,
			assignment_type TEXT NOT NULL,
			assignment_id INTEGER,
			assignment_name TEXT,
			is_active INTEGER NOT NULL DEFAULT 1,
			created_at TEXT NOT NULL,
			UNIQUE(policy_id, assignment_type, assignment_id)
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS access_logs (
			id INTEGER PRIMARY KEY AUTOINCREMENT,
			user_id INTEGER,
			resource_type TEXT NOT NULL,
			resource_id INTEGER,
			action TEXT NOT NULL,
			decision TEXT NOT NULL,
			policy_id INTEGER,
			reason TEXT,
			context TEXT,
			ip_address TEXT,
			user_agent TEXT,
			created_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	tracing::debug!("schema ensured");
	Ok(())
}
