// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Test helpers: in-memory pools with the full schema applied.

use sqlx::sqlite::SqlitePool;

use crate::schema::create_schema;

pub async fn create_test_pool() -> SqlitePool {
	SqlitePool::connect(":memory:").await.unwrap()
}

pub async fn create_schema_for_tests(pool: &SqlitePool) {
	create_schema(pool).await.unwrap();
}
