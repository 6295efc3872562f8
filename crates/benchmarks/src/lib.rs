//! Result extraction for inference-bench.
//!
//! This crate turns the artifacts external benchmark tools leave on disk
//! into a flat `metric name -> f64` mapping.
//!
//! # Quick Start
//!
//! ```no_run
//! use inference_bench_benchmarks::{extract_profile_metrics, summarize_results};
//!
//! // aiperf: aggregate statistics from the profile export
//! let metrics = extract_profile_metrics("/tmp/aiperf-results");
//!
//! // OSWorld: per-task scores, aggregated overall and per domain
//! let summary = summarize_results("/osworld/results");
//! println!("{:?}: {:?}", summary.status(), summary.to_metrics());
//! # let _ = metrics;
//! ```
//!
//! # Modules
//!
//! - [`profile`] - aiperf profile export schema variants
//! - [`evaluation`] - evaluation-harness score aggregation
//! - [`domain`] - task domain inference from result paths
//! - [`io`] - artifact discovery and summary output
//! - [`markdown`] - markdown run summaries

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod domain;
pub mod error;
pub mod evaluation;
pub mod io;
pub mod markdown;
pub mod profile;

pub use domain::infer_domain;
pub use error::ExtractError;
pub use evaluation::{
    extract_evaluation_metrics, summarize_results, EvaluationStatus, EvaluationSummary,
};
pub use profile::{extract_profile_metrics, try_extract_profile_metrics, SchemaShape};
