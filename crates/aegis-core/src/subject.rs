// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subject (user) record as the engine sees it.
//!
//! Registration, credentials, and tokens live outside the authorization
//! core; the engine only reads the fields that feed the evaluation context.

use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// The authenticated principal requesting access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
	pub id: UserId,
	pub email: String,
	pub name: Option<String>,
	pub department: Option<String>,
	pub position: Option<String>,
	pub location: Option<String>,
	/// Security clearance label (e.g. "public", "internal", "confidential",
	/// "secret").
	pub clearance_level: Option<String>,
	pub is_active: bool,
}

/// Fields for creating a subject record.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSubject {
	pub email: String,
	pub name: Option<String>,
	pub department: Option<String>,
	pub position: Option<String>,
	pub location: Option<String>,
	pub clearance_level: Option<String>,
}
