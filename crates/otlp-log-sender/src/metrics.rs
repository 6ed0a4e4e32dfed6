// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Self-observability counters shared by producers and the worker.

use crate::errors::ExportError;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub(crate) struct Counter(AtomicUsize);

impl Counter {
    pub(crate) fn increment(&self) {
        self.increment_by(1);
    }

    pub(crate) fn increment_by(&self, by: usize) {
        self.0.fetch_add(by, Ordering::Relaxed);
    }

    pub(crate) fn sample(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub(crate) struct InternalMetrics {
    pub(crate) records_enqueued: Counter,
    pub(crate) records_dropped: Counter,
    pub(crate) batches_delivered: Counter,
    pub(crate) batches_rejected: Counter,
    pub(crate) batches_transport_failed: Counter,
    pub(crate) batches_encode_failed: Counter,
    pub(crate) records_exported: Counter,
}

impl InternalMetrics {
    /// Accounts for one flush attempt of `records` records.
    pub(crate) fn record_export(&self, result: &Result<(), ExportError>, records: usize) {
        match result {
            Ok(()) => {
                self.batches_delivered.increment();
                self.records_exported.increment_by(records);
            }
            Err(ExportError::Rejected { .. }) => self.batches_rejected.increment(),
            Err(ExportError::Transport(_)) => self.batches_transport_failed.increment(),
            Err(ExportError::Encode(_)) => self.batches_encode_failed.increment(),
        }
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        let InternalMetrics {
            records_enqueued,
            records_dropped,
            batches_delivered,
            batches_rejected,
            batches_transport_failed,
            batches_encode_failed,
            records_exported,
        } = self;

        MetricsSnapshot {
            records_enqueued: records_enqueued.sample(),
            records_dropped: records_dropped.sample(),
            batches_delivered: batches_delivered.sample(),
            batches_rejected: batches_rejected.sample(),
            batches_transport_failed: batches_transport_failed.sample(),
            batches_encode_failed: batches_encode_failed.sample(),
            records_exported: records_exported.sample(),
        }
    }
}

/// Point-in-time copy of the sender's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Records accepted onto the queue.
    pub records_enqueued: usize,
    /// Records rejected because the queue was full or closed.
    pub records_dropped: usize,
    pub batches_delivered: usize,
    pub batches_rejected: usize,
    pub batches_transport_failed: usize,
    pub batches_encode_failed: usize,
    /// Records contained in delivered batches.
    pub records_exported: usize,
}

impl MetricsSnapshot {
    /// Batches that were attempted, whatever the outcome.
    #[must_use]
    pub fn batches_attempted(&self) -> usize {
        self.batches_delivered
            + self.batches_rejected
            + self.batches_transport_failed
            + self.batches_encode_failed
    }
}
