// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Default role, permission, and attribute seeding.
//!
//! `seed_defaults` is idempotent: existing rows are left alone, so it is
//! safe to run at every startup. Permission grants are replaced wholesale
//! on each run, which keeps drifted grants aligned with the defaults.

use aegis_core::{
	AttributeKind, AttributeScope, NewAttributeDefinition, NewPermission, NewRole, Permission,
	PermissionId, Role,
};
use aegis_db::{AttributeRepository, DbError, RoleRepository};

/// Seed the default RBAC catalog and ABAC attribute definitions.
#[tracing::instrument(skip(roles, attributes))]
pub async fn seed_defaults(
	roles: &RoleRepository,
	attributes: &AttributeRepository,
) -> Result<(), DbError> {
	let permissions = seed_permissions(roles).await?;
	seed_roles(roles, &permissions).await?;
	seed_attributes(attributes).await?;
	tracing::info!("default authorization data seeded");
	Ok(())
}

async fn seed_permissions(roles: &RoleRepository) -> Result<Vec<Permission>, DbError> {
	let catalog = [
		("user.read", "Read Users", "user", "read", "View user information"),
		("user.write", "Write Users", "user", "write", "Create and update users"),
		("user.delete", "Delete Users", "user", "delete", "Delete users"),
		("role.read", "Read Roles", "role", "read", "View role information"),
		("role.write", "Write Roles", "role", "write", "Create and update roles"),
		("role.delete", "Delete Roles", "role", "delete", "Delete roles"),
		("permission.read", "Read Permissions", "permission", "read", "View permission information"),
		("permission.write", "Write Permissions", "permission", "write", "Create and update permissions"),
		("permission.delete", "Delete Permissions", "permission", "delete", "Delete permissions"),
		("feature.read", "Read Features", "feature", "read", "View feature information"),
		("feature.write", "Write Features", "feature", "write", "Create and update features"),
		("feature.delete", "Delete Features", "feature", "delete", "Delete features"),
		("policy.read", "Read Policies", "policy", "read", "View policy information"),
		("policy.write", "Write Policies", "policy", "write", "Create and update policies"),
		("policy.delete", "Delete Policies", "policy", "delete", "Delete policies"),
		("report.read", "Read Reports", "report", "read", "View reports"),
	];

	for (name, display_name, resource, action, description) in catalog {
		if roles.get_permission_by_name(name).await?.is_none() {
			roles
				.create_permission(&NewPermission {
					name: name.to_string(),
					display_name: display_name.to_string(),
					description: Some(description.to_string()),
					resource: resource.to_string(),
					action: action.to_string(),
				})
				.await?;
			tracing::debug!(name, "permission seeded");
		}
	}

	roles.list_permissions().await
}

async fn seed_roles(roles: &RoleRepository, permissions: &[Permission]) -> Result<(), DbError> {
	let catalog = [
		("super_admin", "Super Administrator", "Full system access", true),
		("admin", "Administrator", "Administrative access", false),
		("manager", "Manager", "Management access", false),
		("user", "User", "Basic user access", false),
		("readonly", "Read Only", "Read-only access", false),
	];

	for (name, display_name, description, is_system) in catalog {
		let role = match roles.get_role_by_name(name).await? {
			Some(role) => role,
			None => {
				let role = roles
					.create_role(&NewRole {
						name: name.to_string(),
						display_name: display_name.to_string(),
						description: Some(description.to_string()),
						is_system,
					})
					.await?;
				tracing::debug!(name, "role seeded");
				role
			}
		};

		let grants = default_grants(&role, permissions);
		roles.assign_permissions_to_role(role.id, &grants).await?;
	}

	Ok(())
}

fn default_grants(role: &Role, permissions: &[Permission]) -> Vec<PermissionId> {
	permissions
		.iter()
		.filter(|p| match role.name.as_str() {
			"super_admin" => true,
			"admin" => !p.name.starts_with("policy"),
			"manager" => matches!(p.resource.as_str(), "user" | "feature" | "report"),
			"user" => p.resource == "user" && p.action == "read",
			"readonly" => p.action == "read",
			_ => false,
		})
		.map(|p| p.id)
		.collect()
}

async fn seed_attributes(attributes: &AttributeRepository) -> Result<(), DbError> {
	let catalog = [
		("user.department", "Department", "User department", AttributeKind::String, AttributeScope::Subject, None),
		("user.position", "Position", "User position", AttributeKind::String, AttributeScope::Subject, None),
		("user.location", "Location", "User location", AttributeKind::String, AttributeScope::Subject, None),
		(
			"user.clearance_level",
			"Clearance Level",
			"Security clearance level",
			AttributeKind::Enum,
			AttributeScope::Subject,
			Some(vec!["public", "internal", "confidential", "secret"]),
		),
		("user.working_hours", "Working Hours", "User working hours", AttributeKind::String, AttributeScope::Subject, None),
		(
			"resource.sensitivity",
			"Resource Sensitivity",
			"Resource sensitivity level",
			AttributeKind::Enum,
			AttributeScope::Resource,
			Some(vec!["public", "internal", "confidential", "secret"]),
		),
		("resource.owner", "Resource Owner", "Resource owner department", AttributeKind::String, AttributeScope::Resource, None),
		("resource.category", "Resource Category", "Resource category", AttributeKind::String, AttributeScope::Resource, None),
		("env.time", "Current Time", "Current time", AttributeKind::String, AttributeScope::Environment, None),
		("env.ip_address", "IP Address", "Client IP address", AttributeKind::String, AttributeScope::Environment, None),
		("env.location", "Access Location", "Access location", AttributeKind::String, AttributeScope::Environment, None),
	];

	for (name, display_name, description, attribute_type, data_type, allowed_values) in catalog {
		if attributes.get_definition_by_name(name).await?.is_none() {
			attributes
				.create_definition(&NewAttributeDefinition {
					name: name.to_string(),
					display_name: display_name.to_string(),
					description: Some(description.to_string()),
					attribute_type,
					data_type,
					is_required: false,
					is_multivalued: false,
					allowed_values: allowed_values
						.map(|vs| vs.into_iter().map(str::to_string).collect()),
					default_value: None,
				})
				.await?;
			tracing::debug!(name, "attribute definition seeded");
		}
	}

	Ok(())
}
