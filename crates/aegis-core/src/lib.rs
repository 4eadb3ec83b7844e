// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core domain types and the pure evaluation logic for the aegis
//! authorization engine.
//!
//! This crate has no storage or I/O concerns. It defines the RBAC and
//! ABAC domain model (subjects, roles, permissions, policies, attribute
//! definitions), the flat evaluation context with its precedence tiers,
//! and the condition evaluator that decides whether a policy's
//! condition groups hold against a context.
//!
//! Evaluation is default-deny: the engine walks active candidate
//! policies in ascending `(priority, id)` order and the first policy
//! whose four condition groups all hold decides the outcome.
//!
//! ```
//! use aegis_core::{ConditionSet, ContextBuilder};
//! use serde_json::json;
//!
//! let conditions = ConditionSet::decode(Some(&json!({
//! 	"user.department": "engineering",
//! 	"user.clearance_level": { "operator": "gt", "value": 2 },
//! })));
//!
//! let context = ContextBuilder::new()
//! 	.with_value("user.department", json!("engineering"))
//! 	.with_value("user.clearance_level", json!(3))
//! 	.build();
//!
//! assert!(conditions.evaluate(&context));
//! ```

pub mod attribute;
pub mod condition;
pub mod context;
pub mod decision;
pub mod policy;
pub mod rbac;
pub mod subject;
pub mod types;

pub use attribute::{
	AttributeDefinition, NewAttributeDefinition, ResourceAttributeValue, SubjectAttributeValue,
};
pub use condition::{ConditionCheck, ConditionSet};
pub use context::{ContextBuilder, EvalContext};
pub use decision::{AuthorizationRequest, AuthorizationResponse};
pub use policy::{NewPolicy, Policy, PolicyAssignment, PolicyUpdate};
pub use rbac::{NewPermission, NewRole, Permission, PermissionSet, Role};
pub use subject::{NewSubject, Subject};
pub use types::{
	AccessLogId, AssignmentId, AssignmentKind, AttributeId, AttributeKind, AttributeScope, Effect,
	PermissionId, PolicyId, PolicyKind, RoleId, UserId,
};
