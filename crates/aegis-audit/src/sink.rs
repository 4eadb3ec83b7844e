// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Destinations for access log entries.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::entry::AccessLogEntry;
use crate::error::AuditError;

/// A destination that persists access log entries.
///
/// Recording is synchronous with the decision: the engine does not
/// return an answer until `record` succeeds, and a failure here fails
/// the whole evaluation.
#[async_trait]
pub trait AccessLogSink: Send + Sync {
	/// Short identifier for this sink, used in logs.
	fn name(&self) -> &str;

	/// Persist one entry.
	async fn record(&self, entry: &AccessLogEntry) -> Result<(), AuditError>;
}

/// Sink writing access log entries to the `access_logs` table.
pub struct SqliteAccessLogSink {
	pool: SqlitePool,
	name: String,
}

impl SqliteAccessLogSink {
	pub fn new(pool: SqlitePool) -> Self {
		Self {
			pool,
			name: "sqlite".to_string(),
		}
	}
}

#[async_trait]
impl AccessLogSink for SqliteAccessLogSink {
	fn name(&self) -> &str {
		&self.name
	}

	async fn record(&self, entry: &AccessLogEntry) -> Result<(), AuditError> {
		let context_json = serde_json::to_string(&entry.context)?;

		sqlx::query(
			r#"
			INSERT INTO access_logs (
				user_id, resource_type, resource_id, action,
				decision, policy_id, reason, context,
				ip_address, user_agent, created_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(entry.user_id.map(|u| u.as_i64()))
		.bind(&entry.resource_type)
		.bind(entry.resource_id)
		.bind(&entry.action)
		.bind(entry.decision.to_string())
		.bind(entry.policy_id.map(|p| p.as_i64()))
		.bind(&entry.reason)
		.bind(&context_json)
		.bind(&entry.ip_address)
		.bind(&entry.user_agent)
		.bind(entry.timestamp.to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(())
	}
}

/// Sink emitting access log entries as structured tracing events.
///
/// Useful in tests and as a secondary destination; it never fails.
#[derive(Debug, Default)]
pub struct TracingAccessLogSink;

impl TracingAccessLogSink {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl AccessLogSink for TracingAccessLogSink {
	fn name(&self) -> &str {
		"tracing"
	}

	async fn record(&self, entry: &AccessLogEntry) -> Result<(), AuditError> {
		tracing::info!(
			user_id = ?entry.user_id,
			resource_type = %entry.resource_type,
			resource_id = ?entry.resource_id,
			action = %entry.action,
			decision = %entry.decision,
			policy_id = ?entry.policy_id,
			reason = ?entry.reason,
			"access decision"
		);
		Ok(())
	}
}
