// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage error type shared by every repository in this crate.

/// Errors produced by the authorization storage layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
	/// Underlying SQLite failure.
	#[error("database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	/// The named entity (subject, role, permission, policy, attribute)
	/// does not exist.
	#[error("not found: {0}")]
	NotFound(String),

	/// An integrity rule was violated, e.g. a duplicate role name, a
	/// duplicate policy assignment, or a delete of a system role.
	#[error("conflict: {0}")]
	Conflict(String),

	/// A stored row that cannot be mapped back into the domain model.
	#[error("internal: {0}")]
	Internal(String),

	/// Malformed JSON in a condition, obligation, or context column.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn messages_name_the_entity() {
		let not_found = DbError::NotFound("role 42".to_string());
		assert_eq!(not_found.to_string(), "not found: role 42");

		let conflict = DbError::Conflict("system role cannot be deleted: super_admin".to_string());
		assert!(conflict.to_string().contains("super_admin"));
	}
}
