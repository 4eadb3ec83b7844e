// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
	#[error("storage error: {0}")]
	Db(#[from] aegis_db::DbError),

	#[error("access log write failed: {0}")]
	Audit(#[from] aegis_audit::AuditError),

	#[error("evaluation timed out after {0:?}")]
	Timeout(std::time::Duration),
}
