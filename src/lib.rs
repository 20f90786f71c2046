//! apmz: Application Insights telemetry and Azure instance metadata from the command line.
//!
//! Traces and metrics are tracked through an [`apm::Apmer`], either sent to one or more
//! instrumentation keys or printed as newline delimited envelopes that `apmz batch` can
//! upload later. The [`metadata`] module is a client for the instance metadata service
//! with a composable middleware pipeline.

pub mod apm;
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod shell;
pub mod telemetry;
