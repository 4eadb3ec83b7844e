// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read side of the access log.
//!
//! Writes go through the audit sink; this repository only serves the
//! review queries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use aegis_core::{AccessLogId, Effect, PolicyId, UserId};

use crate::error::DbError;

/// A persisted access log row.
#[derive(Debug, Clone, Serialize)]
pub struct AccessLogRecord {
	pub id: AccessLogId,
	pub user_id: Option<UserId>,
	pub resource_type: String,
	pub resource_id: Option<i64>,
	pub action: String,
	pub decision: Effect,
	pub policy_id: Option<PolicyId>,
	pub reason: Option<String>,
	pub context: Option<Value>,
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
	pub created_at: DateTime<Utc>,
}

/// Repository for access log queries.
#[derive(Clone)]
pub struct AccessLogRepository {
	pool: SqlitePool,
}

impl AccessLogRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Most recent entries, newest first, optionally filtered by user.
	#[tracing::instrument(skip(self), fields(limit = limit))]
	pub async fn list_recent(
		&self,
		user_id: Option<UserId>,
		limit: i64,
	) -> Result<Vec<AccessLogRecord>, DbError> {
		let rows = match user_id {
			Some(user_id) => {
				sqlx::query(
					r#"
					SELECT id, user_id, resource_type, resource_id, action, decision,
						policy_id, reason, context, ip_address, user_agent, created_at
					FROM access_logs
					WHERE user_id = ?
					ORDER BY id DESC
					LIMIT ?
					"#,
				)
				.bind(user_id.as_i64())
				.bind(limit)
				.fetch_all(&self.pool)
				.await?
			}
			None => {
				sqlx::query(
					r#"
					SELECT id, user_id, resource_type, resource_id, action, decision,
						policy_id, reason, context, ip_address, user_agent, created_at
					FROM access_logs
					ORDER BY id DESC
					LIMIT ?
					"#,
				)
				.bind(limit)
				.fetch_all(&self.pool)
				.await?
			}
		};

		rows.iter().map(row_to_record).collect()
	}

	/// Total number of recorded decisions.
	#[tracing::instrument(skip(self))]
	pub async fn count(&self) -> Result<i64, DbError> {
		let row = sqlx::query("SELECT COUNT(*) AS n FROM access_logs")
			.fetch_one(&self.pool)
			.await?;
		Ok(row.try_get("n")?)
	}
}

fn row_to_record(row: &SqliteRow) -> Result<AccessLogRecord, DbError> {
	let decision: String = row.try_get("decision")?;
	let context: Option<String> = row.try_get("context")?;
	let context = context.as_deref().map(serde_json::from_str).transpose()?;
	let created_at: String = row.try_get("created_at")?;
	let created_at = DateTime::parse_from_rfc3339(&created_at)
		.map_err(|e| DbError::Internal(format!("invalid created_at: {e}")))?
		.with_timezone(&Utc);

	Ok(AccessLogRecord {
		id: AccessLogId::new(row.try_get("id")?),
		user_id: row.try_get::<Option<i64>, _>("user_id")?.map(UserId::new),
		resource_type: row.try_get("resource_type")?,
		resource_id: row.try_get("resource_id")?,
		action: row.try_get("action")?,
		decision: Effect::parse(&decision),
		policy_id: row.try_get::<Option<i64>, _>("policy_id")?.map(PolicyId::new),
		reason: row.try_get("reason")?,
		context,
		ip_address: row.try_get("ip_address")?,
		user_agent: row.try_get("user_agent")?,
		created_at,
	})
}
