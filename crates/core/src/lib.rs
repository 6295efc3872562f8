// Copyright 2025 Inference Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for inference-bench.
//!
//! This crate holds the types shared by the driver, extractor, and reporter
//! crates:
//!
//! - [`outcome`] - The [`RunOutcome`] produced once per benchmark run
//! - [`metric`] - Flat metric mappings, tags, gauge points, and batches
//! - [`error`] - The pipeline-level failure taxonomy and its exit codes

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod error;
pub mod metric;
pub mod outcome;

pub use error::BenchError;
pub use metric::{MetricBatch, MetricMap, MetricPoint, MetricType, Tags};
pub use outcome::{RunOutcome, RunStatus};
