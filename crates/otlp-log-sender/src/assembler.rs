// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Background worker turning queued records into batches.
//!
//! A batch is flushed as soon as it holds `batch_size` records, and on every
//! tick of a fixed-cadence timer when it is non-empty. Size-triggered flushes
//! do not reset the timer, so a tick shortly after one is usually a no-op.
//! The worker is the only place batches are mutated and the only caller of
//! the exporter, so at most one export is in flight at any time.

use crate::exporter::LogExporter;
use crate::metrics::InternalMetrics;
use crate::queue::QueueReceiver;
use crate::record::LogRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Commands sent to a running [`BatchAssembler`].
#[derive(Debug)]
pub enum AssemblerCommand {
    /// Drain everything queued so far and flush it now. The sender is
    /// notified once the flush attempt finished, whatever its outcome.
    Flush(oneshot::Sender<()>),
}

/// Cloneable handle to a [`BatchAssembler`].
#[derive(Clone, Debug)]
pub struct AssemblerHandle {
    tx: mpsc::UnboundedSender<AssemblerCommand>,
    cancel_token: CancellationToken,
}

impl AssemblerHandle {
    /// Requests an immediate flush, returning a receiver resolved when it is
    /// done. `None` when the worker is gone.
    pub fn flush(&self) -> Option<oneshot::Receiver<()>> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(AssemblerCommand::Flush(tx)).ok().map(|()| rx)
    }

    /// Stops intake; the worker drains what is buffered, flushes it and
    /// exits.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

pub struct BatchAssembler {
    queue: QueueReceiver,
    exporter: Arc<dyn LogExporter>,
    batch_size: usize,
    flush_interval: Duration,
    metrics: Arc<InternalMetrics>,
    batch: Vec<LogRecord>,
    rx: mpsc::UnboundedReceiver<AssemblerCommand>,
    cancel_token: CancellationToken,
}

impl BatchAssembler {
    #[must_use]
    pub fn new(
        queue: QueueReceiver,
        exporter: Arc<dyn LogExporter>,
        batch_size: usize,
        flush_interval: Duration,
        metrics: Arc<InternalMetrics>,
    ) -> (Self, AssemblerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel_token = CancellationToken::new();
        let batch_size = batch_size.max(1);
        let assembler = BatchAssembler {
            queue,
            exporter,
            batch_size,
            flush_interval,
            metrics,
            batch: Vec::with_capacity(batch_size),
            rx,
            cancel_token: cancel_token.clone(),
        };
        (assembler, AssemblerHandle { tx, cancel_token })
    }

    /// Runs until shut down through the handle, or until every producer is
    /// gone. Both paths end with a final flush of whatever was buffered.
    pub async fn run(mut self) {
        let mut ticker = interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await; // discard first tick

        let mut commands_open = true;
        loop {
            tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => {
                    debug!("LOGS | Shutting down batch assembler");
                    self.drain_and_flush().await;
                    break;
                }
                command = self.rx.recv(), if commands_open => match command {
                    Some(AssemblerCommand::Flush(done)) => {
                        self.queue.drain_into(&mut self.batch);
                        self.flush_all().await;
                        // The requester may have given up waiting.
                        let _ = done.send(());
                    }
                    None => commands_open = false,
                },
                record = self.queue.recv() => match record {
                    Some(record) => {
                        self.batch.push(record);
                        if self.batch.len() >= self.batch_size {
                            self.flush().await;
                        }
                    }
                    None => {
                        debug!("LOGS | All producers gone, flushing remaining records");
                        self.flush_all().await;
                        break;
                    }
                },
                _ = ticker.tick() => {
                    if !self.batch.is_empty() {
                        debug!("LOGS | Flush interval elapsed, flushing {} records", self.batch.len());
                        self.flush().await;
                    }
                }
            }
        }
    }

    /// Closes the queue, pulls every buffered record and flushes them in
    /// batches of at most `batch_size`.
    pub async fn drain_and_flush(&mut self) {
        self.queue.close();
        self.queue.drain_into(&mut self.batch);
        self.flush_all().await;
    }

    async fn flush_all(&mut self) {
        while !self.batch.is_empty() {
            if self.batch.len() > self.batch_size {
                let rest = self.batch.split_off(self.batch_size);
                self.flush().await;
                self.batch = rest;
            } else {
                self.flush().await;
            }
        }
    }

    async fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        let batch = std::mem::replace(&mut self.batch, Vec::with_capacity(self.batch_size));
        let result = self.exporter.export(&batch).await;
        self.metrics.record_export(&result, batch.len());
    }
}
