// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use otlp_log_sender::{AttributeValue, Attributes, Config, LogSender};

#[tokio::main]
pub async fn main() {
    let log_level = env::var("OTEL_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,rustls=off,reqwest=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };
    let shutdown_timeout = config.request_timeout;

    info!(
        "Sending logs to {} (batch size {}, flush interval {:?})",
        config.logs_url(),
        config.batch_size,
        config.flush_interval
    );

    let mut sender = match LogSender::new(config) {
        Ok(sender) => sender,
        Err(e) => {
            error!("Failed to create log sender: {}", e);
            return;
        }
    };
    if let Err(e) = sender.start() {
        error!("Failed to start log sender: {}", e);
        return;
    }

    sender.log("INFO", 9, "Application started", None);
    sender.log(
        "WARN",
        13,
        "Retry attempt",
        Some(Attributes::from([
            ("retry.count".to_string(), AttributeValue::from(3)),
            ("timeout".to_string(), AttributeValue::from(30.5)),
            ("enabled".to_string(), AttributeValue::from(true)),
            ("user".to_string(), AttributeValue::from("john_doe")),
        ])),
    );

    if let Err(e) = sender.shutdown(shutdown_timeout).await {
        error!("Log sender did not shut down cleanly: {}", e);
    }

    match serde_json::to_string(&sender.metrics()) {
        Ok(snapshot) => info!("Log sender metrics: {}", snapshot),
        Err(e) => error!("Failed to serialize metrics: {}", e),
    }
}
