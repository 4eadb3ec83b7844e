// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attribute definition and value repository.
//!
//! Definitions describe what the policy language may reference; values
//! bind a definition to a subject or resource instance. Writes are
//! upserts: one live value per `(subject, attribute)` or
//! `(resource, attribute)` binding.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use aegis_core::{
	AttributeDefinition, AttributeId, AttributeKind, AttributeScope, NewAttributeDefinition,
	ResourceAttributeValue, SubjectAttributeValue, UserId,
};

use crate::error::DbError;

/// The attribute reads the engine needs for context assembly.
#[async_trait]
pub trait AttributeStore: Send + Sync {
	/// All attribute values bound to a subject, as `(name, value)` pairs.
	async fn get_subject_attributes(&self, user_id: UserId) -> Result<Vec<(String, String)>, DbError>;
}

/// Repository for attribute database operations.
#[derive(Clone)]
pub struct AttributeRepository {
	pool: SqlitePool,
}

impl AttributeRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	// =========================================================================
	// Definitions
	// =========================================================================

	/// Create an attribute definition.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the name is already defined.
	#[tracing::instrument(skip(self, definition), fields(name = %definition.name))]
	pub async fn create_definition(
		&self,
		definition: &NewAttributeDefinition,
	) -> Result<AttributeDefinition, DbError> {
		let now = Utc::now().to_rfc3339();
		let allowed_values = definition
			.allowed_values
			.as_ref()
			.map(serde_json::to_string)
			.transpose()?;

		let result = sqlx::query(
			r#"
			INSERT INTO attributes (name, display_name, description, attribute_type, data_type,
				is_required, is_multivalued, allowed_values, default_value, created_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(&definition.name)
		.bind(&definition.display_name)
		.bind(&definition.description)
		.bind(definition.attribute_type.to_string())
		.bind(definition.data_type.to_string())
		.bind(definition.is_required as i32)
		.bind(definition.is_multivalued as i32)
		.bind(&allowed_values)
		.bind(&definition.default_value)
		.bind(&now)
		.execute(&self.pool)
		.await
		.map_err(|e| match &e {
			sqlx::Error::Database(db) if db.is_unique_violation() => {
				DbError::Conflict(format!("attribute already defined: {}", definition.name))
			}
			_ => DbError::Sqlx(e),
		})?;

		Ok(AttributeDefinition {
			id: AttributeId::new(result.last_insert_rowid()),
			name: definition.name.clone(),
			display_name: definition.display_name.clone(),
			description: definition.description.clone(),
			attribute_type: definition.attribute_type,
			data_type: definition.data_type,
			is_required: definition.is_required,
			is_multivalued: definition.is_multivalued,
			allowed_values: definition.allowed_values.clone(),
			default_value: definition.default_value.clone(),
		})
	}

	/// Get a definition by its unique name.
	#[tracing::instrument(skip(self), fields(name = %name))]
	pub async fn get_definition_by_name(
		&self,
		name: &str,
	) -> Result<Option<AttributeDefinition>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, name, display_name, description, attribute_type, data_type,
				is_required, is_multivalued, allowed_values, default_value
			FROM attributes
			WHERE name = ?
			"#,
		)
		.bind(name)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_definition(&r)).transpose()
	}

	/// List definitions, optionally filtered by scope, ordered by name.
	#[tracing::instrument(skip(self))]
	pub async fn list_definitions(
		&self,
		scope: Option<AttributeScope>,
	) -> Result<Vec<AttributeDefinition>, DbError> {
		let rows = match scope {
			Some(scope) => {
				sqlx::query(
					r#"
					SELECT id, name, display_name, description, attribute_type, data_type,
						is_required, is_multivalued, allowed_values, default_value
					FROM attributes
					WHERE data_type = ?
					ORDER BY name
					"#,
				)
				.bind(scope.to_string())
				.fetch_all(&self.pool)
				.await?
			}
			None => {
				sqlx::query(
					r#"
					SELECT id, name, display_name, description, attribute_type, data_type,
						is_required, is_multivalued, allowed_values, default_value
					FROM attributes
					ORDER BY name
					"#,
				)
				.fetch_all(&self.pool)
				.await?
			}
		};

		rows.iter().map(row_to_definition).collect()
	}

	// =========================================================================
	// Subject values
	// =========================================================================

	/// Upsert an attribute value on a subject.
	///
	/// The definition must exist; the write replaces any previous value
	/// for this `(subject, attribute)` binding.
	///
	/// # Errors
	/// Returns `DbError::NotFound` if the attribute is not defined.
	#[tracing::instrument(skip(self, value), fields(user_id = %user_id, name = %name))]
	pub async fn set_subject_attribute(
		&self,
		user_id: UserId,
		name: &str,
		value: &str,
	) -> Result<SubjectAttributeValue, DbError> {
		let definition = self
			.get_definition_by_name(name)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("attribute not defined: {name}")))?;

		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			INSERT INTO user_attributes (user_id, attribute_id, value, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?)
			ON CONFLICT(user_id, attribute_id)
			DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
			"#,
		)
		.bind(user_id.as_i64())
		.bind(definition.id.as_i64())
		.bind(value)
		.bind(&now)
		.bind(&now)
		.execute(&self.pool)
		.await?;

		tracing::debug!(user_id = %user_id, name = %name, "subject attribute set");

		Ok(SubjectAttributeValue {
			user_id,
			attribute_id: definition.id,
			name: definition.name,
			value: value.to_string(),
		})
	}

	/// Get one attribute value bound to a subject, by definition name.
	#[tracing::instrument(skip(self), fields(user_id = %user_id, name = %name))]
	pub async fn get_subject_attribute(
		&self,
		user_id: UserId,
		name: &str,
	) -> Result<Option<String>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT ua.value
			FROM user_attributes ua
			JOIN attributes a ON a.id = ua.attribute_id
			WHERE ua.user_id = ? AND a.name = ?
			"#,
		)
		.bind(user_id.as_i64())
		.bind(name)
		.fetch_optional(&self.pool)
		.await?;

		Ok(row.map(|r| r.try_get("value")).transpose()?)
	}

	/// All attribute values bound to a subject, as `(name, value)` pairs.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn get_subject_attributes(
		&self,
		user_id: UserId,
	) -> Result<Vec<(String, String)>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT a.name, ua.value
			FROM user_attributes ua
			JOIN attributes a ON a.id = ua.attribute_id
			WHERE ua.user_id = ?
			ORDER BY a.name
			"#,
		)
		.bind(user_id.as_i64())
		.fetch_all(&self.pool)
		.await?;

		rows
			.into_iter()
			.map(|r| Ok((r.try_get("name")?, r.try_get("value")?)))
			.collect()
	}

	// =========================================================================
	// Resource values
	// =========================================================================

	/// Upsert an attribute value on a resource instance.
	///
	/// # Errors
	/// Returns `DbError::NotFound` if the attribute is not defined.
	#[tracing::instrument(skip(self, value), fields(resource_type = %resource_type, resource_id = resource_id, name = %name))]
	pub async fn set_resource_attribute(
		&self,
		resource_type: &str,
		resource_id: i64,
		name: &str,
		value: &str,
	) -> Result<ResourceAttributeValue, DbError> {
		let definition = self
			.get_definition_by_name(name)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("attribute not defined: {name}")))?;

		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			INSERT INTO resource_attributes (resource_type, resource_id, attribute_id, value, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?)
			ON CONFLICT(resource_type, resource_id, attribute_id)
			DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
			"#,
		)
		.bind(resource_type)
		.bind(resource_id)
		.bind(definition.id.as_i64())
		.bind(value)
		.bind(&now)
		.bind(&now)
		.execute(&self.pool)
		.await?;

		Ok(ResourceAttributeValue {
			resource_type: resource_type.to_string(),
			resource_id,
			attribute_id: definition.id,
			name: definition.name,
			value: value.to_string(),
		})
	}

	/// All attribute values bound to a resource instance.
	#[tracing::instrument(skip(self), fields(resource_type = %resource_type, resource_id = resource_id))]
	pub async fn get_resource_attributes(
		&self,
		resource_type: &str,
		resource_id: i64,
	) -> Result<Vec<(String, String)>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT a.name, ra.value
			FROM resource_attributes ra
			JOIN attributes a ON a.id = ra.attribute_id
			WHERE ra.resource_type = ? AND ra.resource_id = ?
			ORDER BY a.name
			"#,
		)
		.bind(resource_type)
		.bind(resource_id)
		.fetch_all(&self.pool)
		.await?;

		rows
			.into_iter()
			.map(|r| Ok((r.try_get("name")?, r.try_get("value")?)))
			.collect()
	}
}

#[async_trait]
impl AttributeStore for AttributeRepository {
	async fn get_subject_attributes(
		&self,
		user_id: UserId,
	) -> Result<Vec<(String, String)>, DbError> {
		AttributeRepository::get_subject_attributes(self, user_id).await
	}
}

fn row_to_definition(row: &SqliteRow) -> Result<AttributeDefinition, DbError> {
	let attribute_type: String = row.try_get("attribute_type")?;
	let data_type: String = row.try_get("data_type")?;
	let allowed_values: Option<String> = row.try_get("allowed_values")?;
	let allowed_values = allowed_values
		.as_deref()
		.map(serde_json::from_str)
		.transpose()?;

	Ok(AttributeDefinition {
		id: AttributeId::new(row.try_get("id")?),
		name: row.try_get("name")?,
		display_name: row.try_get("display_name")?,
		description: row.try_get("description")?,
		attribute_type: AttributeKind::parse(&attribute_type),
		data_type: AttributeScope::parse(&data_type),
		is_required: row.try_get::<i64, _>("is_required")? != 0,
		is_multivalued: row.try_get::<i64, _>("is_multivalued")? != 0,
		allowed_values,
		default_value: row.try_get("default_value")?,
	})
}
