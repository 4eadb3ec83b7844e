// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Evaluation context assembly.
//!
//! The context is a single flat mapping from attribute name to JSON value,
//! assembled from four layers with fixed precedence (lowest first):
//!
//! 1. attribute-store values for the subject
//! 2. subject core fields (`user.id`, `user.email`, ...)
//! 3. request fields (`resource.type`, `resource.id`, `action`, `timestamp`)
//! 4. caller-supplied extra context
//!
//! Later layers override earlier ones on key conflicts. The engine calls the
//! layer methods in exactly this order; the builder itself is just an ordered
//! merge.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::subject::Subject;

/// An immutable, fully assembled evaluation context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalContext {
	values: BTreeMap<String, Value>,
}

impl EvalContext {
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.values.get(key)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.values.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
		self.values.iter()
	}

	/// Structured snapshot of the whole context, persisted with each access
	/// log entry.
	pub fn snapshot(&self) -> Value {
		Value::Object(self.values.clone().into_iter().collect())
	}
}

/// Builder merging the context layers in their fixed precedence order.
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
	values: BTreeMap<String, Value>,
}

impl ContextBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Layer 1: attribute-store values for the subject. Values arrive
	/// string-encoded from storage and stay strings in the context.
	pub fn with_subject_attributes<I, K, V>(mut self, attributes: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		for (name, value) in attributes {
			self.values.insert(name.into(), Value::String(value.into()));
		}
		self
	}

	/// Layer 2: subject core fields, overriding any same-named attribute from
	/// the store. Absent optional fields are inserted as explicit nulls so a
	/// condition on them fails on value, not on key absence.
	pub fn with_subject(mut self, subject: &Subject) -> Self {
		self.values
			.insert("user.id".to_string(), Value::from(subject.id.as_i64()));
		self.values
			.insert("user.email".to_string(), Value::String(subject.email.clone()));
		for (key, field) in [
			("user.department", &subject.department),
			("user.position", &subject.position),
			("user.location", &subject.location),
			("user.clearance_level", &subject.clearance_level),
		] {
			self.values.insert(
				key.to_string(),
				field.clone().map(Value::String).unwrap_or(Value::Null),
			);
		}
		self
	}

	/// Layer 3: request fields. The timestamp is the evaluation time in
	/// RFC 3339 form.
	pub fn with_request(
		mut self,
		resource_type: &str,
		resource_id: Option<i64>,
		action: &str,
		now: DateTime<Utc>,
	) -> Self {
		self.values.insert(
			"resource.type".to_string(),
			Value::String(resource_type.to_string()),
		);
		self.values.insert(
			"resource.id".to_string(),
			resource_id.map(Value::from).unwrap_or(Value::Null),
		);
		self.values
			.insert("action".to_string(), Value::String(action.to_string()));
		self.values.insert(
			"timestamp".to_string(),
			Value::String(now.to_rfc3339_opts(SecondsFormat::Secs, true)),
		);
		self
	}

	/// Layer 4: caller-supplied extras, the highest-precedence tier.
	pub fn with_extras(mut self, extras: &Map<String, Value>) -> Self {
		for (key, value) in extras {
			self.values.insert(key.clone(), value.clone());
		}
		self
	}

	/// Insert a single value at the current layer. Mostly useful in tests.
	pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
		self.values.insert(key.into(), value);
		self
	}

	pub fn build(self) -> EvalContext {
		EvalContext {
			values: self.values,
		}
	}
}
