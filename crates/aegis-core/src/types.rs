// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for the authorization system.
//!
//! This module defines the foundational types used throughout Aegis:
//!
//! - **ID newtypes**: Type-safe wrappers around database row IDs for the
//!   different entity types ([`UserId`], [`RoleId`], [`PolicyId`], etc.)
//!   preventing accidental mixing
//! - **Decision types**: The allow/deny outcome of an evaluation ([`Effect`])
//! - **Classification enums**: Policy labels ([`PolicyKind`]), assignment
//!   targets ([`AssignmentKind`]), attribute value kinds ([`AttributeKind`])
//!   and attribute scopes ([`AttributeScope`])
//!
//! All ID types implement transparent serde serialization (as integers) and
//! provide conversion to/from `i64`.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(i64);

		impl $name {
			/// Create a new ID from a raw row ID.
			pub fn new(id: i64) -> Self {
				Self(id)
			}

			/// Get the inner integer value.
			pub fn into_inner(self) -> i64 {
				self.0
			}

			/// Get the inner integer value without consuming the ID.
			pub fn as_i64(&self) -> i64 {
				self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<i64> for $name {
			fn from(id: i64) -> Self {
				Self(id)
			}
		}

		impl From<$name> for i64 {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for a user (the subject).");
define_id_type!(RoleId, "Unique identifier for a role.");
define_id_type!(PermissionId, "Unique identifier for a permission.");
define_id_type!(AttributeId, "Unique identifier for an attribute definition.");
define_id_type!(PolicyId, "Unique identifier for a policy.");
define_id_type!(AssignmentId, "Unique identifier for a policy assignment.");
define_id_type!(AccessLogId, "Unique identifier for an access log entry.");

// =============================================================================
// Decision types
// =============================================================================

/// The outcome a matching policy produces, and the final decision of an
/// authorization evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
	Allow,
	Deny,
}

impl Effect {
	/// Parse the stored string form. Anything unrecognized resolves to
	/// `Deny` (fail closed).
	pub fn parse(s: &str) -> Self {
		match s {
			"allow" => Effect::Allow,
			_ => Effect::Deny,
		}
	}

	pub fn is_allow(&self) -> bool {
		matches!(self, Effect::Allow)
	}
}

impl fmt::Display for Effect {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Effect::Allow => write!(f, "allow"),
			Effect::Deny => write!(f, "deny"),
		}
	}
}

/// Advisory label describing a policy's intent. The actual outcome of a
/// match is always the policy's [`Effect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
	Allow,
	Deny,
	Conditional,
}

impl PolicyKind {
	pub fn parse(s: &str) -> Self {
		match s {
			"allow" => PolicyKind::Allow,
			"deny" => PolicyKind::Deny,
			_ => PolicyKind::Conditional,
		}
	}
}

impl fmt::Display for PolicyKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			PolicyKind::Allow => "allow",
			PolicyKind::Deny => "deny",
			PolicyKind::Conditional => "conditional",
		};
		write!(f, "{s}")
	}
}

/// The target kind of a policy assignment.
///
/// Role- and resource-scoped assignments exist in the data model but only
/// `User` and `Global` assignments contribute to candidate selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentKind {
	User,
	Role,
	Resource,
	Global,
}

impl AssignmentKind {
	pub fn parse(s: &str) -> Option<Self> {
		match s {
			"user" => Some(AssignmentKind::User),
			"role" => Some(AssignmentKind::Role),
			"resource" => Some(AssignmentKind::Resource),
			"global" => Some(AssignmentKind::Global),
			_ => None,
		}
	}
}

impl fmt::Display for AssignmentKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			AssignmentKind::User => "user",
			AssignmentKind::Role => "role",
			AssignmentKind::Resource => "resource",
			AssignmentKind::Global => "global",
		};
		write!(f, "{s}")
	}
}

/// Value kind of an attribute definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
	String,
	Number,
	Boolean,
	Date,
	Enum,
}

impl AttributeKind {
	pub fn parse(s: &str) -> Self {
		match s {
			"number" => AttributeKind::Number,
			"boolean" => AttributeKind::Boolean,
			"date" => AttributeKind::Date,
			"enum" => AttributeKind::Enum,
			_ => AttributeKind::String,
		}
	}
}

impl fmt::Display for AttributeKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			AttributeKind::String => "string",
			AttributeKind::Number => "number",
			AttributeKind::Boolean => "boolean",
			AttributeKind::Date => "date",
			AttributeKind::Enum => "enum",
		};
		write!(f, "{s}")
	}
}

/// Which part of an evaluation context an attribute describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeScope {
	Subject,
	Resource,
	Action,
	Environment,
}

impl AttributeScope {
	pub fn parse(s: &str) -> Self {
		match s {
			"resource" => AttributeScope::Resource,
			"action" => AttributeScope::Action,
			"environment" => AttributeScope::Environment,
			_ => AttributeScope::Subject,
		}
	}
}

impl fmt::Display for AttributeScope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			AttributeScope::Subject => "subject",
			AttributeScope::Resource => "resource",
			AttributeScope::Action => "action",
			AttributeScope::Environment => "environment",
		};
		write!(f, "{s}")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn id_types_round_trip() {
		let id = UserId::new(42);
		assert_eq!(id.as_i64(), 42);
		assert_eq!(id.to_string(), "42");
		assert_eq!(UserId::from(i64::from(id)), id);
	}

	#[test]
	fn id_types_do_not_mix() {
		// Serde representation is the bare integer.
		let json = serde_json::to_string(&PolicyId::new(7)).unwrap();
		assert_eq!(json, "7");
		let back: PolicyId = serde_json::from_str(&json).unwrap();
		assert_eq!(back, PolicyId::new(7));
	}

	#[test]
	fn effect_parse_fails_closed() {
		assert_eq!(Effect::parse("allow"), Effect::Allow);
		assert_eq!(Effect::parse("deny"), Effect::Deny);
		assert_eq!(Effect::parse("ALLOW"), Effect::Deny);
		assert_eq!(Effect::parse("garbage"), Effect::Deny);
	}

	#[test]
	fn assignment_kind_parse() {
		assert_eq!(AssignmentKind::parse("user"), Some(AssignmentKind::User));
		assert_eq!(AssignmentKind::parse("global"), Some(AssignmentKind::Global));
		assert_eq!(AssignmentKind::parse("team"), None);
	}

	#[test]
	fn display_is_snake_case() {
		assert_eq!(AssignmentKind::Resource.to_string(), "resource");
		assert_eq!(AttributeScope::Environment.to_string(), "environment");
		assert_eq!(AttributeKind::Enum.to_string(), "enum");
		assert_eq!(PolicyKind::Conditional.to_string(), "conditional");
	}
}
