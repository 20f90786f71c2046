//! One-time construction of the process-wide delivery abstraction.

use crate::apm::Apmer;
use crate::error::ApmError;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

type ApmerInit = Box<dyn Fn() -> Result<Arc<dyn Apmer>, ApmError> + Send + Sync>;

/// Lazily constructs the APMer on first use, exactly once even under concurrent access.
///
/// A failed construction is not cached; the next caller tries again and sees the same
/// configuration error.
pub struct ApmerCell {
    init: ApmerInit,
    instance: OnceCell<Arc<dyn Apmer>>,
}

impl ApmerCell {
    pub fn new<F>(init: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Apmer>, ApmError> + Send + Sync + 'static,
    {
        Self {
            init: Box::new(init),
            instance: OnceCell::new(),
        }
    }

    /// Get the shared instance, constructing it on first call.
    pub fn get(&self) -> Result<Arc<dyn Apmer>, ApmError> {
        self.instance
            .get_or_try_init(|| {
                debug!("Constructing telemetry delivery");
                (self.init)()
            })
            .map(Arc::clone)
    }

    pub fn is_initialized(&self) -> bool {
        self.instance.get().is_some()
    }

    /// Close the instance if it was ever constructed.
    pub async fn close(&self, deadline: Duration) {
        if let Some(apmer) = self.instance.get() {
            apmer.close(deadline).await;
        }
    }
}
