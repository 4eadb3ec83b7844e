// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Role-based access control entities and permission resolution.
//!
//! Roles grant permissions; a subject's effective permission set is the
//! union of the permissions of every role assigned to it, de-duplicated by
//! permission identity. [`PermissionSet`] holds the resolved union and
//! answers the coarse `(resource, action)` check.

use serde::{Deserialize, Serialize};

use crate::types::{PermissionId, RoleId};

/// A named role. System roles are seeded at bootstrap and cannot be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
	pub id: RoleId,
	pub name: String,
	pub display_name: String,
	pub description: Option<String>,
	pub is_active: bool,
	pub is_system: bool,
}

/// Fields for creating a role.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRole {
	pub name: String,
	pub display_name: String,
	pub description: Option<String>,
	#[serde(default)]
	pub is_system: bool,
}

/// A permission authorizing one `(resource, action)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
	pub id: PermissionId,
	pub name: String,
	pub display_name: String,
	pub description: Option<String>,
	pub resource: String,
	pub action: String,
	pub is_active: bool,
}

/// Fields for creating a permission.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPermission {
	pub name: String,
	pub display_name: String,
	pub description: Option<String>,
	pub resource: String,
	pub action: String,
}

/// A subject's resolved permission union.
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
	permissions: Vec<Permission>,
}

impl PermissionSet {
	/// Build a set from an iterator of permissions, collapsing duplicate
	/// IDs (the same permission granted through several roles).
	pub fn from_permissions<I>(permissions: I) -> Self
	where
		I: IntoIterator<Item = Permission>,
	{
		let mut seen = std::collections::HashSet::new();
		let permissions = permissions
			.into_iter()
			.filter(|p| seen.insert(p.id))
			.collect();
		Self { permissions }
	}

	pub fn len(&self) -> usize {
		self.permissions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.permissions.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Permission> {
		self.permissions.iter()
	}

	/// True iff some permission in the set matches both `resource` and
	/// `action`. The permission's `is_active` flag is not consulted at
	/// check time; deactivation takes effect by revoking the grant.
	pub fn allows(&self, resource: &str, action: &str) -> bool {
		self
			.permissions
			.iter()
			.any(|p| p.resource == resource && p.action == action)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn perm(id: i64, resource: &str, action: &str, is_active: bool) -> Permission {
		Permission {
			id: PermissionId::new(id),
			name: format!("{resource}.{action}"),
			display_name: format!("{resource} {action}"),
			description: None,
			resource: resource.to_string(),
			action: action.to_string(),
			is_active,
		}
	}

	#[test]
	fn union_collapses_duplicates() {
		let set = PermissionSet::from_permissions([
			perm(1, "user", "read", true),
			perm(2, "user", "write", true),
			perm(1, "user", "read", true),
		]);
		assert_eq!(set.len(), 2);
	}

	#[test]
	fn allows_matches_resource_and_action() {
		let set = PermissionSet::from_permissions([perm(1, "user", "read", true)]);
		assert!(set.allows("user", "read"));
		assert!(!set.allows("user", "write"));
		assert!(!set.allows("report", "read"));
	}

	#[test]
	fn allows_ignores_inactive_flag() {
		let set = PermissionSet::from_permissions([perm(1, "user", "read", false)]);
		assert!(set.allows("user", "read"));
	}

	#[test]
	fn empty_set_allows_nothing() {
		let set = PermissionSet::default();
		assert!(!set.allows("user", "read"));
	}
}
