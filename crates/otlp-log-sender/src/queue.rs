// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded multi-producer / single-consumer queue of pending records.
//!
//! Producers never wait: when the queue is full the incoming record is
//! rejected and everything already queued stays untouched.

use crate::errors::EnqueueError;
use crate::record::LogRecord;
use tokio::sync::mpsc;

/// Creates a queue holding at most `capacity` records (at least one).
#[must_use]
pub fn channel(capacity: usize) -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (QueueSender { tx }, QueueReceiver { rx })
}

#[derive(Clone, Debug)]
pub struct QueueSender {
    tx: mpsc::Sender<LogRecord>,
}

impl QueueSender {
    /// Non-blocking enqueue; callable from any thread, with or without a
    /// runtime.
    pub fn try_enqueue(&self, record: LogRecord) -> Result<(), EnqueueError> {
        self.tx.try_send(record).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EnqueueError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }

    /// Number of records currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Debug)]
pub struct QueueReceiver {
    rx: mpsc::Receiver<LogRecord>,
}

impl QueueReceiver {
    /// Waits for the next record. `None` once every sender is gone (or the
    /// queue was closed) and the buffer is drained.
    pub async fn recv(&mut self) -> Option<LogRecord> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<LogRecord> {
        self.rx.try_recv().ok()
    }

    /// Stops intake. Records already buffered can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Moves every buffered record into `batch`, returning how many were
    /// taken.
    pub fn drain_into(&mut self, batch: &mut Vec<LogRecord>) -> usize {
        let before = batch.len();
        while let Some(record) = self.try_recv() {
            batch.push(record);
        }
        batch.len() - before
    }
}
