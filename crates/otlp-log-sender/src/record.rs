// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log records and the `resourceLogs` → `scopeLogs` → `log_records` envelope
//! posted to the collector.

use crate::value::{serde_number, AttributeValue, KeyValue};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// OpenTelemetry severity levels, at the base number of each range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Severity {
    #[must_use]
    pub const fn number(self) -> i32 {
        match self {
            Severity::Trace => 1,
            Severity::Debug => 5,
            Severity::Info => 9,
            Severity::Warn => 13,
            Severity::Error => 17,
            Severity::Fatal => 21,
        }
    }

    #[must_use]
    pub const fn text(self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Nanoseconds since the Unix epoch, or 0 when the clock is before it.
#[must_use]
pub fn now_unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// A single log event. Immutable once handed to the sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// 0 means unknown.
    #[serde(default, deserialize_with = "serde_number::deserialize")]
    pub time_unix_nano: u64,
    #[serde(default)]
    pub severity_text: String,
    #[serde(default)]
    pub severity_number: i32,
    #[serde(default, with = "serde_body")]
    pub body: Option<AttributeValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    pub fn new(
        severity_text: impl Into<String>,
        severity_number: i32,
        body: impl Into<AttributeValue>,
    ) -> Self {
        Self {
            time_unix_nano: now_unix_nanos(),
            severity_text: severity_text.into(),
            severity_number,
            body: Some(body.into()),
            attributes: Vec::new(),
        }
    }

    pub fn with_severity(severity: Severity, body: impl Into<AttributeValue>) -> Self {
        Self::new(severity.text(), severity.number(), body)
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: Vec<KeyValue>) -> Self {
        self.attributes = attributes;
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, time_unix_nano: u64) -> Self {
        self.time_unix_nano = time_unix_nano;
        self
    }
}

/// Attributes identifying the emitting process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub attributes: Vec<KeyValue>,
}

impl Resource {
    pub fn new(attributes: Vec<KeyValue>) -> Self {
        Self { attributes }
    }
}

/// Name and version of the logger producing the records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

impl Scope {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Request body for `POST /v1/logs`.
///
/// Serialization borrows the exporter's resource, scope and the batch; a
/// decoded request owns its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportLogsServiceRequest<'a> {
    pub resource_logs: Vec<ResourceLogs<'a>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLogs<'a> {
    pub resource: Cow<'a, Resource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope_logs: Vec<ScopeLogs<'a>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeLogs<'a> {
    pub scope: Cow<'a, Scope>,
    #[serde(default, skip_serializing_if = "is_empty_records")]
    pub log_records: Cow<'a, [LogRecord]>,
}

fn is_empty_records(records: &Cow<'_, [LogRecord]>) -> bool {
    records.is_empty()
}

impl<'a> ExportLogsServiceRequest<'a> {
    /// Wraps a batch under a single resource and scope.
    pub fn new(resource: &'a Resource, scope: &'a Scope, records: &'a [LogRecord]) -> Self {
        Self {
            resource_logs: vec![ResourceLogs {
                resource: Cow::Borrowed(resource),
                scope_logs: vec![ScopeLogs {
                    scope: Cow::Borrowed(scope),
                    log_records: Cow::Borrowed(records),
                }],
            }],
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// All records in the request, in envelope order.
    pub fn records(&self) -> impl Iterator<Item = &LogRecord> {
        self.resource_logs
            .iter()
            .flat_map(|rl| rl.scope_logs.iter())
            .flat_map(|sl| sl.log_records.iter())
    }
}

impl ExportLogsServiceRequest<'static> {
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

// An unset body is written as `{}`; `{}`, `null` or a missing key read back
// as unset.
mod serde_body {
    use crate::value::AttributeValue;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Unset {}

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BodyRepr {
        Value(AttributeValue),
        Unset(Unset),
    }

    pub fn serialize<S>(value: &Option<AttributeValue>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => v.serialize(serializer),
            None => serializer.serialize_map(Some(0))?.end(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<AttributeValue>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<BodyRepr>::deserialize(deserializer)? {
            Some(BodyRepr::Value(v)) => Some(v),
            Some(BodyRepr::Unset(_)) | None => None,
        })
    }
}
