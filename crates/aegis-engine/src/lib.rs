// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Orchestration layer for aegis authorization.
//!
//! Wires the stores, the condition evaluator, and the audit sink into
//! [`AuthorizationEngine`], and seeds the default RBAC/ABAC catalog via
//! [`seed_defaults`].

pub mod bootstrap;
pub mod engine;
pub mod error;

pub use bootstrap::seed_defaults;
pub use engine::{AuthorizationEngine, EngineConfig};
pub use error::EngineError;
