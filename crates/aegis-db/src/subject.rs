// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subject (user) repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use aegis_core::{NewSubject, Subject, UserId};

use crate::error::DbError;

/// Read access to subject records, as the engine needs them.
#[async_trait]
pub trait SubjectStore: Send + Sync {
	async fn get_subject(&self, id: UserId) -> Result<Option<Subject>, DbError>;
}

/// Repository for subject database operations.
#[derive(Clone)]
pub struct SubjectRepository {
	pool: SqlitePool,
}

impl SubjectRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a subject record.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the email is already registered.
	#[tracing::instrument(skip(self, subject), fields(email = %subject.email))]
	pub async fn create_subject(&self, subject: &NewSubject) -> Result<Subject, DbError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			r#"
			INSERT INTO users (email, name, department, position, location, clearance_level, is_active, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
			"#,
		)
		.bind(&subject.email)
		.bind(&subject.name)
		.bind(&subject.department)
		.bind(&subject.position)
		.bind(&subject.location)
		.bind(&subject.clearance_level)
		.bind(&now)
		.bind(&now)
		.execute(&self.pool)
		.await
		.map_err(|e| match &e {
			sqlx::Error::Database(db) if db.is_unique_violation() => {
				DbError::Conflict(format!("email already registered: {}", subject.email))
			}
			_ => DbError::Sqlx(e),
		})?;

		let id = UserId::new(result.last_insert_rowid());
		tracing::debug!(user_id = %id, "subject created");

		Ok(Subject {
			id,
			email: subject.email.clone(),
			name: subject.name.clone(),
			department: subject.department.clone(),
			position: subject.position.clone(),
			location: subject.location.clone(),
			clearance_level: subject.clearance_level.clone(),
			is_active: true,
		})
	}

	/// Get a subject by ID.
	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn get_subject(&self, id: UserId) -> Result<Option<Subject>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, email, name, department, position, location, clearance_level, is_active
			FROM users
			WHERE id = ?
			"#,
		)
		.bind(id.as_i64())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_subject(&r)).transpose()
	}

	/// Get a subject by email.
	#[tracing::instrument(skip(self), fields(email = %email))]
	pub async fn get_subject_by_email(&self, email: &str) -> Result<Option<Subject>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, email, name, department, position, location, clearance_level, is_active
			FROM users
			WHERE email = ?
			"#,
		)
		.bind(email)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_subject(&r)).transpose()
	}

	/// Mark a subject inactive. The record is kept for audit history.
	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn deactivate_subject(&self, id: UserId) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query("UPDATE users SET is_active = 0, updated_at = ? WHERE id = ?")
			.bind(&now)
			.bind(id.as_i64())
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("user {id}")));
		}
		Ok(())
	}
}

#[async_trait]
impl SubjectStore for SubjectRepository {
	async fn get_subject(&self, id: UserId) -> Result<Option<Subject>, DbError> {
		SubjectRepository::get_subject(self, id).await
	}
}

fn row_to_subject(row: &SqliteRow) -> Result<Subject, DbError> {
	Ok(Subject {
		id: UserId::new(row.try_get("id")?),
		email: row.try_get("email")?,
		name: row.try_get("name")?,
		department: row.try_get("department")?,
		position: row.try_get("position")?,
		location: row.try_get("location")?,
		clearance_level: row.try_get("clearance_level")?,
		is_active: row.try_get::<i64, _>("is_active")? != 0,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{create_schema_for_tests, create_test_pool};

	fn new_subject(email: &str) -> NewSubject {
		NewSubject {
			email: email.to_string(),
			name: Some("Test User".to_string()),
			department: Some("engineering".to_string()),
			position: None,
			location: None,
			clearance_level: Some("internal".to_string()),
		}
	}

	#[tokio::test]
	async fn create_and_fetch_subject() {
		let pool = create_test_pool().await;
		create_schema_for_tests(&pool).await;
		let repo = SubjectRepository::new(pool);

		let created = repo.create_subject(&new_subject("a@example.com")).await.unwrap();
		let fetched = repo.get_subject(created.id).await.unwrap().unwrap();
		assert_eq!(fetched, created);
		assert!(fetched.is_active);
	}

	#[tokio::test]
	async fn duplicate_email_is_a_conflict() {
		let pool = create_test_pool().await;
		create_schema_for_tests(&pool).await;
		let repo = SubjectRepository::new(pool);

		repo.create_subject(&new_subject("dup@example.com")).await.unwrap();
		let err = repo.create_subject(&new_subject("dup@example.com")).await.unwrap_err();
		assert!(matches!(err, DbError::Conflict(_)));
	}

	#[tokio::test]
	async fn deactivate_flips_flag() {
		let pool = create_test_pool().await;
		create_schema_for_tests(&pool).await;
		let repo = SubjectRepository::new(pool);

		let created = repo.create_subject(&new_subject("b@example.com")).await.unwrap();
		repo.deactivate_subject(created.id).await.unwrap();
		let fetched = repo.get_subject(created.id).await.unwrap().unwrap();
		assert!(!fetched.is_active);
	}

	#[tokio::test]
	async fn missing_subject_is_none() {
		let pool = create_test_pool().await;
		create_schema_for_tests(&pool).await;
		let repo = SubjectRepository::new(pool);

		assert!(repo.get_subject(UserId::new(999)).await.unwrap().is_none());
	}
}
