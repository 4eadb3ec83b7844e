// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access logging for the aegis authorization engine.
//!
//! Every evaluation the engine performs is recorded as one
//! [`AccessLogEntry`] through an [`AccessLogSink`]. The write happens
//! synchronously, before the decision is returned, so the access log is
//! a complete record of every answer the engine has ever given.
//!
//! Two sinks are provided: [`SqliteAccessLogSink`] persists entries to
//! the `access_logs` table, and [`TracingAccessLogSink`] emits them as
//! structured log events.

pub mod entry;
pub mod error;
pub mod sink;

pub use entry::{AccessLogBuilder, AccessLogEntry};
pub use error::AuditError;
pub use sink::{AccessLogSink, SqliteAccessLogSink, TracingAccessLogSink};
