// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::errors::ConfigError;
use crate::record::{Resource, Scope};
use crate::value::KeyValue;
use std::env;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:4318";
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SERVICE_NAME: &str = "unknown_service";

const SERVICE_NAME_KEY: &str = "service.name";
const SERVICE_VERSION_KEY: &str = "service.version";

/// Configuration for a [`crate::LogSender`]
#[derive(Debug, Clone)]
pub struct Config {
    /// Collector base URL; records are posted to `<endpoint>/v1/logs`
    pub endpoint: String,
    /// Number of accumulated records that triggers an immediate flush
    pub batch_size: usize,
    /// Cadence of the periodic flush timer
    pub flush_interval: Duration,
    /// Maximum number of records buffered between producers and the worker
    pub queue_capacity: usize,
    /// Deadline for each outbound request
    pub request_timeout: Duration,
    /// `service.name` resource attribute
    pub service_name: String,
    /// `service.version` resource attribute, omitted when unset
    pub service_version: Option<String>,
    /// Extra resource attributes
    pub resource_attributes: Vec<KeyValue>,
    /// Instrumentation scope name
    pub scope_name: String,
    /// Instrumentation scope version, omitted from the payload when empty
    pub scope_version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_version: None,
            resource_attributes: Vec::new(),
            scope_name: env!("CARGO_PKG_NAME").to_string(),
            scope_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Config {
    /// Create configuration from the standard OpenTelemetry environment
    /// variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`], reading variables through `lookup`.
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| {
            lookup(key)
                .map(|val| val.trim().to_string())
                .filter(|val| !val.is_empty())
        };
        let parse_count = |key: &str, default: usize| {
            non_empty(key)
                .and_then(|val| val.parse::<usize>().ok())
                .unwrap_or(default)
        };
        let parse_millis = |key: &str, default: Duration| {
            non_empty(key)
                .and_then(|val| val.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(default)
        };

        let mut service_name = non_empty("OTEL_SERVICE_NAME");
        let mut service_version = None;
        let mut resource_attributes = Vec::new();
        for (key, value) in non_empty("OTEL_RESOURCE_ATTRIBUTES")
            .as_deref()
            .map(parse_resource_attributes)
            .unwrap_or_default()
        {
            match key.as_str() {
                SERVICE_NAME_KEY => {
                    service_name.get_or_insert(value);
                }
                SERVICE_VERSION_KEY => service_version = Some(value),
                _ => resource_attributes.push(KeyValue::new(key, value)),
            }
        }

        let config = Self {
            endpoint: non_empty("OTEL_EXPORTER_OTLP_ENDPOINT").unwrap_or(defaults.endpoint),
            batch_size: parse_count("OTEL_BLRP_MAX_EXPORT_BATCH_SIZE", defaults.batch_size),
            flush_interval: parse_millis("OTEL_BLRP_SCHEDULE_DELAY", defaults.flush_interval),
            queue_capacity: parse_count("OTEL_BLRP_MAX_QUEUE_SIZE", defaults.queue_capacity),
            request_timeout: parse_millis("OTEL_EXPORTER_OTLP_TIMEOUT", defaults.request_timeout),
            service_name: service_name.unwrap_or(defaults.service_name),
            service_version,
            resource_attributes,
            scope_name: defaults.scope_name,
            scope_version: defaults.scope_version,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid_endpoint = |reason: String| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason,
        };
        let url = reqwest::Url::parse(self.endpoint.trim())
            .map_err(|e| invalid_endpoint(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid_endpoint(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.flush_interval.is_zero() {
            return Err(ConfigError::ZeroFlushInterval);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroRequestTimeout);
        }

        Ok(())
    }

    /// Full URL of the logs ingestion route.
    #[must_use]
    pub fn logs_url(&self) -> String {
        format!("{}/v1/logs", self.endpoint.trim().trim_end_matches('/'))
    }

    /// Resource attached to every batch: service identity, extra attributes,
    /// then the SDK identity.
    #[must_use]
    pub fn resource(&self) -> Resource {
        let mut attributes = Vec::with_capacity(self.resource_attributes.len() + 5);
        attributes.push(KeyValue::new(SERVICE_NAME_KEY, self.service_name.as_str()));
        if let Some(version) = &self.service_version {
            attributes.push(KeyValue::new(SERVICE_VERSION_KEY, version.as_str()));
        }
        attributes.extend(
            self.resource_attributes
                .iter()
                .filter(|kv| kv.key != SERVICE_NAME_KEY && kv.key != SERVICE_VERSION_KEY)
                .cloned(),
        );
        attributes.push(KeyValue::new("telemetry.sdk.language", "rust"));
        attributes.push(KeyValue::new("telemetry.sdk.name", env!("CARGO_PKG_NAME")));
        attributes.push(KeyValue::new(
            "telemetry.sdk.version",
            env!("CARGO_PKG_VERSION"),
        ));
        Resource::new(attributes)
    }

    #[must_use]
    pub fn scope(&self) -> Scope {
        Scope::new(self.scope_name.as_str(), self.scope_version.as_str())
    }
}

// `k1=v1,k2=v2`; entries without `=` or with an empty key are skipped.
fn parse_resource_attributes(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoint, "http://localhost:4318");
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.flush_interval, Duration::from_secs(3));
        assert_eq!(config.queue_capacity, 1000);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_from_lookup_without_variables_uses_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.service_name, DEFAULT_SERVICE_NAME);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert!(config.resource_attributes.is_empty());
    }

    #[test]
    fn test_from_lookup_reads_variables() {
        let config = Config::from_lookup(lookup_from(&[
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "https://collector:4318/"),
            ("OTEL_SERVICE_NAME", "checkout"),
            ("OTEL_BLRP_MAX_EXPORT_BATCH_SIZE", "25"),
            ("OTEL_BLRP_SCHEDULE_DELAY", "500"),
            ("OTEL_BLRP_MAX_QUEUE_SIZE", "64"),
            ("OTEL_EXPORTER_OTLP_TIMEOUT", "2000"),
        ]))
        .unwrap();

        assert_eq!(config.logs_url(), "https://collector:4318/v1/logs");
        assert_eq!(config.service_name, "checkout");
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.flush_interval, Duration::from_millis(500));
        assert_eq!(config.queue_capacity, 64);
        assert_eq!(config.request_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_from_lookup_ignores_unparseable_values() {
        let config = Config::from_lookup(lookup_from(&[
            ("OTEL_BLRP_MAX_EXPORT_BATCH_SIZE", "lots"),
            ("OTEL_BLRP_SCHEDULE_DELAY", "-5"),
            ("OTEL_SERVICE_NAME", "   "),
        ]))
        .unwrap();
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.flush_interval, DEFAULT_FLUSH_INTERVAL);
        assert_eq!(config.service_name, DEFAULT_SERVICE_NAME);
    }

    #[test]
    fn test_from_lookup_rejects_zero_batch_size() {
        let result = Config::from_lookup(lookup_from(&[("OTEL_BLRP_MAX_EXPORT_BATCH_SIZE", "0")]));
        assert!(matches!(result, Err(ConfigError::ZeroBatchSize)));
    }

    #[test]
    fn test_resource_attributes_from_lookup() {
        let config = Config::from_lookup(lookup_from(&[(
            "OTEL_RESOURCE_ATTRIBUTES",
            "deployment.environment=prod, service.name=from-attrs,service.version=1.2.3,broken,=x",
        )]))
        .unwrap();

        assert_eq!(config.service_name, "from-attrs");
        assert_eq!(config.service_version.as_deref(), Some("1.2.3"));
        assert_eq!(
            config.resource_attributes,
            vec![KeyValue::new("deployment.environment", "prod")]
        );
    }

    #[test]
    fn test_service_name_variable_wins_over_resource_attributes() {
        let config = Config::from_lookup(lookup_from(&[
            ("OTEL_SERVICE_NAME", "explicit"),
            ("OTEL_RESOURCE_ATTRIBUTES", "service.name=from-attrs"),
        ]))
        .unwrap();
        assert_eq!(config.service_name, "explicit");
    }

    #[test]
    fn test_validate_endpoint() {
        for endpoint in ["", "not a url", "ftp://collector:21"] {
            let config = Config {
                endpoint: endpoint.to_string(),
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidEndpoint { .. })),
                "endpoint '{}' should be rejected",
                endpoint
            );
        }
    }

    #[test]
    fn test_validate_zero_values() {
        let config = Config {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroQueueCapacity)
        ));

        let config = Config {
            flush_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroFlushInterval)
        ));

        let config = Config {
            request_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroRequestTimeout)
        ));
    }

    #[test]
    fn test_resource_order() {
        let config = Config {
            service_name: "checkout".to_string(),
            service_version: Some("2.0.0".to_string()),
            resource_attributes: vec![
                KeyValue::new("host.name", "web-1"),
                KeyValue::new("service.name", "ignored"),
            ],
            ..Default::default()
        };
        let keys: Vec<String> = config
            .resource()
            .attributes
            .into_iter()
            .map(|kv| kv.key)
            .collect();
        assert_eq!(
            keys,
            vec![
                "service.name",
                "service.version",
                "host.name",
                "telemetry.sdk.language",
                "telemetry.sdk.name",
                "telemetry.sdk.version",
            ]
        );
    }

    #[test]
    fn test_scope_defaults_to_crate_identity() {
        let scope = Config::default().scope();
        assert_eq!(scope.name, "otlp-log-sender");
        assert_eq!(scope.version, env!("CARGO_PKG_VERSION"));
    }
}
