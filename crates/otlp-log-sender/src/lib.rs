// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-process OTLP/HTTP log client.
//!
//! Application code hands log events to a [`LogSender`] without blocking.
//! A single background worker groups them into batches (flushed when a
//! batch reaches the configured size, or on a fixed interval) and posts
//! each batch as OTLP/JSON to `<endpoint>/v1/logs`. Delivery is best effort
//! and at most once: a full queue drops new records, and a failed batch is
//! logged and discarded.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod assembler;
pub mod config;
pub mod errors;
pub mod exporter;
mod metrics;
pub mod queue;
pub mod record;
pub mod sender;
pub mod value;

pub use config::Config;
pub use errors::{ConfigError, EnqueueError, ExportError, SenderError};
pub use exporter::{HttpExporter, LogExporter};
pub use metrics::MetricsSnapshot;
pub use record::{ExportLogsServiceRequest, LogRecord, Resource, Scope, Severity};
pub use sender::{Attributes, LogSender};
pub use value::{to_attribute_value, AttributeValue, KeyValue};
