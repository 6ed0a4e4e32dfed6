// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batch delivery to an OTLP/HTTP collector.
//!
//! Each batch gets exactly one POST. Whatever the outcome, the batch is
//! discarded afterwards: there is no retry and no spillover.

use crate::config::Config;
use crate::errors::{ExportError, SenderError};
use crate::record::{ExportLogsServiceRequest, LogRecord, Resource, Scope};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use std::fmt::Debug;
use tracing::{debug, error};

/// Delivers one batch of records.
///
/// Implementations report failures through diagnostic logs themselves; the
/// returned error only classifies the outcome.
#[async_trait]
pub trait LogExporter: Debug + Send + Sync {
    async fn export(&self, records: &[LogRecord]) -> Result<(), ExportError>;
}

/// Exporter posting OTLP/JSON to `<endpoint>/v1/logs`.
#[derive(Debug, Clone)]
pub struct HttpExporter {
    client: reqwest::Client,
    url: String,
    resource: Resource,
    scope: Scope,
}

impl HttpExporter {
    /// Builds the HTTP client and the static resource/scope once.
    pub fn new(config: &Config) -> Result<Self, SenderError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(SenderError::HttpClient)?;

        Ok(HttpExporter {
            client,
            url: config.logs_url(),
            resource: config.resource(),
            scope: config.scope(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn encode(&self, records: &[LogRecord]) -> Result<Vec<u8>, ExportError> {
        Ok(ExportLogsServiceRequest::new(&self.resource, &self.scope, records).encode()?)
    }

    async fn send(&self, body: Vec<u8>) -> Result<(), ExportError> {
        let resp = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() < 400 {
            return Ok(());
        }

        // Single diagnostic entry per rejection.
        match resp.bytes().await {
            Ok(bytes) => {
                match serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(&bytes)
                {
                    Ok(body) => error!(
                        "LOGS | Collector rejected logs (status {}): {}",
                        status.as_u16(),
                        serde_json::Value::Object(body)
                    ),
                    Err(e) => error!(
                        "LOGS | Failed to decode error response (status {}): {}",
                        status.as_u16(),
                        e
                    ),
                }
            }
            Err(e) => error!(
                "LOGS | Failed to decode error response (status {}): {}",
                status.as_u16(),
                e
            ),
        }

        Err(ExportError::Rejected {
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl LogExporter for HttpExporter {
    async fn export(&self, records: &[LogRecord]) -> Result<(), ExportError> {
        let body = match self.encode(records) {
            Ok(body) => body,
            Err(e) => {
                error!("LOGS | {}", e);
                return Err(e);
            }
        };

        let result = self.send(body).await;
        match &result {
            Ok(()) => debug!("LOGS | Logs successfully sent ({} records)", records.len()),
            Err(e @ ExportError::Transport(_)) => error!("LOGS | {}", e),
            Err(_) => {}
        }
        result
    }
}
