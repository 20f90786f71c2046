//! Telemetry delivery: the APMer capability, its proxy implementation, and the
//! once-per-process cell that owns it.

use crate::telemetry::Telemetry;
use async_trait::async_trait;
use std::time::Duration;

pub mod cell;
pub mod printer;
pub mod proxy;

pub use cell::ApmerCell;
pub use printer::{BufferPrinter, LinePrinter, StdoutPrinter};
pub use proxy::{ApmProxy, DeliverySettings};

/// Sends telemetry to Application Insights, or prints it when running locally.
#[async_trait]
pub trait Apmer: Send + Sync {
    /// Track one item. Never fails; delivery problems surface on close (and are logged).
    fn track(&self, item: Telemetry);

    /// Flush and close every destination, waiting at most `deadline`.
    async fn close(&self, deadline: Duration);
}
