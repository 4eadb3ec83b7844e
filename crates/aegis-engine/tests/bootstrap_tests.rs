// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Integration tests for default data seeding and permission checks.

use std::sync::Arc;

use tempfile::TempDir;

use aegis_audit::TracingAccessLogSink;
use aegis_core::{NewSubject, Subject};
use aegis_db::{
	create_pool, create_schema, AttributeRepository, PolicyRepository, RoleRepository,
	SubjectRepository,
};
use aegis_engine::{seed_defaults, AuthorizationEngine};

struct SeedHarness {
	roles: RoleRepository,
	attributes: AttributeRepository,
	subjects: SubjectRepository,
	policies: PolicyRepository,
	_dir: TempDir,
}

impl SeedHarness {
	async fn setup() -> Self {
		let dir = TempDir::new().unwrap();
		let db_url = format!("sqlite:{}?mode=rwc", dir.path().join("seed_test.db").display());
		let pool = create_pool(&db_url).await.unwrap();
		create_schema(&pool).await.unwrap();

		Self {
			roles: RoleRepository::new(pool.clone()),
			attributes: AttributeRepository::new(pool.clone()),
			subjects: SubjectRepository::new(pool.clone()),
			policies: PolicyRepository::new(pool),
			_dir: dir,
		}
	}

	fn engine(&self) -> AuthorizationEngine {
		AuthorizationEngine::new(
			Arc::new(self.subjects.clone()),
			Arc::new(self.attributes.clone()),
			Arc::new(self.policies.clone()),
			Arc::new(self.roles.clone()),
			Arc::new(TracingAccessLogSink::new()),
		)
	}

	async fn create_member(&self, email: &str) -> Subject {
		self.subjects
			.create_subject(&NewSubject {
				email: email.to_string(),
				name: None,
				department: None,
				position: None,
				location: None,
				clearance_level: None,
			})
			.await
			.unwrap()
	}
}

#[tokio::test]
async fn seeding_is_idempotent() {
	let h = SeedHarness::setup().await;

	seed_defaults(&h.roles, &h.attributes).await.unwrap();
	seed_defaults(&h.roles, &h.attributes).await.unwrap();

	assert_eq!(h.roles.list_roles().await.unwrap().len(), 5);
	assert_eq!(h.roles.list_permissions().await.unwrap().len(), 16);
	assert_eq!(h.attributes.list_definitions(None).await.unwrap().len(), 11);
}

#[tokio::test]
async fn super_admin_holds_every_permission() {
	let h = SeedHarness::setup().await;
	seed_defaults(&h.roles, &h.attributes).await.unwrap();

	let super_admin = h.roles.get_role_by_name("super_admin").await.unwrap().unwrap();
	assert!(super_admin.is_system);
	assert_eq!(h.roles.get_role_permissions(super_admin.id).await.unwrap().len(), 16);

	let admin = h.roles.get_role_by_name("admin").await.unwrap().unwrap();
	let admin_perms = h.roles.get_role_permissions(admin.id).await.unwrap();
	assert_eq!(admin_perms.len(), 13);
	assert!(admin_perms.iter().all(|p| !p.name.starts_with("policy")));
}

#[tokio::test]
async fn readonly_role_grants_only_reads() {
	let h = SeedHarness::setup().await;
	seed_defaults(&h.roles, &h.attributes).await.unwrap();

	let readonly = h.roles.get_role_by_name("readonly").await.unwrap().unwrap();
	let perms = h.roles.get_role_permissions(readonly.id).await.unwrap();
	assert_eq!(perms.len(), 6);
	assert!(perms.iter().all(|p| p.action == "read"));
}

#[tokio::test]
async fn has_permission_resolves_through_seeded_roles() {
	let h = SeedHarness::setup().await;
	seed_defaults(&h.roles, &h.attributes).await.unwrap();

	let member = h.create_member("member@example.com").await;
	let user_role = h.roles.get_role_by_name("user").await.unwrap().unwrap();
	h.roles.assign_roles_to_user(member.id, &[user_role.id]).await.unwrap();

	let engine = h.engine();

	assert!(engine.has_permission(member.id, "user", "read").await.unwrap());
	assert!(!engine.has_permission(member.id, "user", "write").await.unwrap());
	assert!(!engine.has_permission(member.id, "report", "read").await.unwrap());
}

#[tokio::test]
async fn reassigning_roles_revokes_dropped_permissions() {
	let h = SeedHarness::setup().await;
	seed_defaults(&h.roles, &h.attributes).await.unwrap();

	let member = h.create_member("manager@example.com").await;
	let user_role = h.roles.get_role_by_name("user").await.unwrap().unwrap();
	let manager = h.roles.get_role_by_name("manager").await.unwrap().unwrap();

	let engine = h.engine();

	h.roles
		.assign_roles_to_user(member.id, &[user_role.id, manager.id])
		.await
		.unwrap();
	assert!(engine.has_permission(member.id, "user", "write").await.unwrap());
	assert!(engine.has_permission(member.id, "report", "read").await.unwrap());

	// Replacing the role set drops everything the manager role granted.
	h.roles.assign_roles_to_user(member.id, &[user_role.id]).await.unwrap();
	assert!(!engine.has_permission(member.id, "user", "write").await.unwrap());
	assert!(!engine.has_permission(member.id, "report", "read").await.unwrap());
	assert!(engine.has_permission(member.id, "user", "read").await.unwrap());
}
