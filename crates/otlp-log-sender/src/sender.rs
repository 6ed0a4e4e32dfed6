// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Producer-facing entry point.
//!
//! [`LogSender::log`] is fire-and-forget: it never blocks, never fails and
//! never waits on the network. Records that cannot be queued are dropped with
//! a warning and counted in [`LogSender::metrics`].

use crate::assembler::{AssemblerHandle, BatchAssembler};
use crate::config::Config;
use crate::errors::SenderError;
use crate::exporter::{HttpExporter, LogExporter};
use crate::metrics::{InternalMetrics, MetricsSnapshot};
use crate::queue::{self, QueueSender};
use crate::record::{LogRecord, Severity};
use crate::value::{AttributeValue, KeyValue};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

/// Attribute map accepted by [`LogSender::log`].
pub type Attributes = HashMap<String, AttributeValue>;

const WORKER_THREAD_NAME: &str = "otlp-log-sender";

pub struct LogSender {
    queue: QueueSender,
    handle: AssemblerHandle,
    metrics: Arc<InternalMetrics>,
    // Present until the worker is started.
    assembler: Option<BatchAssembler>,
    done: Option<oneshot::Receiver<()>>,
}

impl LogSender {
    /// Creates a sender exporting over HTTP. Records can be logged right
    /// away; they are buffered until [`LogSender::start`] is called.
    pub fn new(config: Config) -> Result<Self, SenderError> {
        config.validate()?;
        let exporter = Arc::new(HttpExporter::new(&config)?);
        Ok(Self::build(&config, exporter))
    }

    /// Creates a sender delivering batches through a custom exporter.
    pub fn with_exporter(
        config: Config,
        exporter: Arc<dyn LogExporter>,
    ) -> Result<Self, SenderError> {
        config.validate()?;
        Ok(Self::build(&config, exporter))
    }

    fn build(config: &Config, exporter: Arc<dyn LogExporter>) -> Self {
        let (queue, receiver) = queue::channel(config.queue_capacity);
        let metrics = Arc::new(InternalMetrics::default());
        let (assembler, handle) = BatchAssembler::new(
            receiver,
            exporter,
            config.batch_size,
            config.flush_interval,
            Arc::clone(&metrics),
        );

        LogSender {
            queue,
            handle,
            metrics,
            assembler: Some(assembler),
            done: None,
        }
    }

    /// Starts the background worker.
    ///
    /// On a tokio runtime thread the worker is spawned onto that runtime;
    /// anywhere else it gets a dedicated thread with its own single-threaded
    /// runtime.
    pub fn start(&mut self) -> Result<(), SenderError> {
        let Some(assembler) = self.assembler.take() else {
            return Err(SenderError::AlreadyStarted);
        };

        let (done_tx, done_rx) = oneshot::channel();
        let worker = async move {
            assembler.run().await;
            // Nobody may be waiting for shutdown.
            let _ = done_tx.send(());
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(worker);
            }
            Err(_) => {
                std::thread::Builder::new()
                    .name(WORKER_THREAD_NAME.to_string())
                    .spawn(move || {
                        match tokio::runtime::Builder::new_current_thread()
                            .enable_all()
                            .build()
                        {
                            Ok(runtime) => runtime.block_on(worker),
                            Err(e) => error!("LOGS | Failed to build worker runtime: {}", e),
                        }
                    })?;
            }
        }

        debug!("LOGS | Log sender started");
        self.done = Some(done_rx);
        Ok(())
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.assembler.is_none()
    }

    /// Queues a log record built from the given parts. Never blocks and never
    /// reports failure to the caller.
    pub fn log(
        &self,
        severity_text: &str,
        severity_number: i32,
        message: impl Into<String>,
        attributes: Option<Attributes>,
    ) {
        let mut record = LogRecord::new(severity_text, severity_number, message.into());
        if let Some(attributes) = attributes {
            record.attributes = attributes
                .into_iter()
                .map(|(key, value)| KeyValue { key, value })
                .collect();
        }
        self.emit(record);
    }

    pub fn log_severity(
        &self,
        severity: Severity,
        message: impl Into<String>,
        attributes: Option<Attributes>,
    ) {
        self.log(severity.text(), severity.number(), message, attributes);
    }

    /// Queues an already built record under the same drop-on-full policy as
    /// [`LogSender::log`].
    pub fn emit(&self, record: LogRecord) {
        match self.queue.try_enqueue(record) {
            Ok(()) => self.metrics.records_enqueued.increment(),
            Err(e) => {
                self.metrics.records_dropped.increment();
                warn!("LOGS | {}", e);
            }
        }
    }

    /// Asks the worker to flush everything queued so far.
    ///
    /// Returns `true` once that flush attempt completed, `false` if the
    /// worker is not running or `timeout` elapsed first.
    pub async fn flush(&self, timeout: Duration) -> bool {
        if !self.is_started() {
            return false;
        }
        let Some(done) = self.handle.flush() else {
            return false;
        };
        matches!(tokio::time::timeout(timeout, done).await, Ok(Ok(())))
    }

    /// Stops intake, flushes every buffered record and waits up to `timeout`
    /// for the worker to finish. Records logged afterwards are dropped.
    pub async fn shutdown(&mut self, timeout: Duration) -> Result<(), SenderError> {
        let finished = if let Some(mut assembler) = self.assembler.take() {
            tokio::time::timeout(timeout, assembler.drain_and_flush())
                .await
                .is_ok()
        } else {
            self.handle.shutdown();
            match self.done.take() {
                // A closed channel means the worker already exited.
                Some(done) => tokio::time::timeout(timeout, done).await.is_ok(),
                None => true,
            }
        };

        if finished {
            debug!("LOGS | Log sender shut down");
            Ok(())
        } else {
            Err(SenderError::ShutdownTimeout(timeout))
        }
    }

    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
