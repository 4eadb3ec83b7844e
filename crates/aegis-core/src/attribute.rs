// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attribute definitions and bound values.
//!
//! Definitions describe the attributes the policy language may reference
//! (dotted namespace names like `user.department`). Values bind a
//! definition to a subject or to a resource instance, string-encoded. One
//! live value per binding: writing again overwrites.

use serde::{Deserialize, Serialize};

use crate::types::{AttributeId, AttributeKind, AttributeScope, UserId};

/// An attribute definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
	pub id: AttributeId,
	/// Unique dotted name, e.g. `user.department`.
	pub name: String,
	pub display_name: String,
	pub description: Option<String>,
	pub attribute_type: AttributeKind,
	pub data_type: AttributeScope,
	pub is_required: bool,
	/// Declared but not honored by storage: values are single-valued per
	/// binding regardless.
	pub is_multivalued: bool,
	/// Permitted values for enum-typed attributes.
	pub allowed_values: Option<Vec<String>>,
	pub default_value: Option<String>,
}

/// Fields for creating an attribute definition.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAttributeDefinition {
	pub name: String,
	pub display_name: String,
	pub description: Option<String>,
	pub attribute_type: AttributeKind,
	pub data_type: AttributeScope,
	#[serde(default)]
	pub is_required: bool,
	#[serde(default)]
	pub is_multivalued: bool,
	pub allowed_values: Option<Vec<String>>,
	pub default_value: Option<String>,
}

/// An attribute value bound to a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectAttributeValue {
	pub user_id: UserId,
	pub attribute_id: AttributeId,
	/// Definition name, joined in for context assembly.
	pub name: String,
	pub value: String,
}

/// An attribute value bound to a resource instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAttributeValue {
	pub resource_id: i64,
	pub resource_type: String,
	pub attribute_id: AttributeId,
	pub name: String,
	pub value: String,
}
