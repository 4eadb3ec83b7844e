// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for the aegis authorization engine.
//!
//! Each domain area gets a repository struct holding the shared pool,
//! plus a narrow `*Store` trait covering the queries the evaluation
//! engine needs. Storage conventions: RFC 3339 TEXT timestamps, INTEGER
//! 0/1 booleans, JSON payloads as TEXT decoded on read.

pub mod access_log;
pub mod attribute;
pub mod error;
pub mod policy;
pub mod pool;
pub mod rbac;
pub mod schema;
pub mod subject;
pub mod testing;

pub use access_log::{AccessLogRecord, AccessLogRepository};
pub use attribute::{AttributeRepository, AttributeStore};
pub use error::DbError;
pub use policy::{PolicyRepository, PolicyStore};
pub use pool::create_pool;
pub use rbac::{RbacStore, RoleRepository};
pub use schema::create_schema;
pub use subject::{SubjectRepository, SubjectStore};
