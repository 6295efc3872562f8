// Copyright 2025 Inference Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Metric delivery for inference-bench.
//!
//! Turns an extracted metric mapping into tagged gauge points and submits
//! them to Datadog in batches, with bounded retries and exponential backoff,
//! on a background task the caller can wait on with a timeout.
//!
//! # Example
//!
//! ```no_run
//! use inference_bench_core::{MetricMap, Tags};
//! use inference_bench_reporter::{
//!     build_points, DatadogClient, DatadogConfig, DeliveryPolicy, MetricReporter,
//! };
//! use std::sync::Arc;
//!
//! # async fn example(metrics: MetricMap) -> inference_bench_reporter::Result<()> {
//! let policy = DeliveryPolicy::default();
//! let client = DatadogClient::new(&DatadogConfig::new("api-key"), policy.request_timeout)?;
//! let reporter = MetricReporter::new(Arc::new(client), policy.clone());
//!
//! let tags = Tags::new().with("benchmark", "aiperf");
//! let points = build_points(&metrics, "inference.benchmark.aiperf", &tags);
//! let outcome = reporter.dispatch(points).wait(policy.wait_timeout).await;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod datadog;
pub mod delivery;
pub mod error;
pub mod llmobs;

pub use config::{DatadogConfig, DeliveryPolicy, LlmObsConfig};
pub use datadog::{DatadogClient, MetricsSink};
pub use delivery::{build_points, DeliveryHandle, DeliveryOutcome, MetricReporter};
pub use error::{ReporterError, Result};
pub use llmobs::LlmObsClient;
