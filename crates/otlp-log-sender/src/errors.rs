// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for configuring, feeding and running the log sender.
//!
//! None of these ever reach callers of [`crate::LogSender::log`]; producer-side
//! failures are reported through diagnostic log entries and internal counters.

use std::time::Duration;

/// Invalid [`crate::config::Config`] values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Batch size must be greater than 0")]
    ZeroBatchSize,

    #[error("Queue capacity must be greater than 0")]
    ZeroQueueCapacity,

    #[error("Flush interval must be greater than 0")]
    ZeroFlushInterval,

    #[error("Request timeout must be greater than 0")]
    ZeroRequestTimeout,
}

/// Reasons a record could not be placed on the ingest queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EnqueueError {
    /// The queue is at capacity; the new record was dropped.
    #[error("Log queue full, dropping log entry")]
    QueueFull,

    /// The worker stopped accepting records.
    #[error("Log queue closed, dropping log entry")]
    Closed,
}

/// Terminal outcome of a failed delivery attempt. The batch is discarded in
/// every case.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Error marshaling log batch: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Error sending logs: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Collector rejected log batch with status {status}")]
    Rejected { status: u16 },
}

/// Failures while constructing or driving a [`crate::LogSender`].
#[derive(Debug, thiserror::Error)]
pub enum SenderError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("Log sender already started")]
    AlreadyStarted,

    #[error("Failed to spawn log sender worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),
}
