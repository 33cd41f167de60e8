//! One-shot cross-context requests (tare, shutdown).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A latched request flag shared between contexts.
///
/// Any context may raise it. It stays raised until the consuming context
/// claims it with [`Signal::take`].
#[derive(Debug, Clone, Default)]
pub struct Signal(Arc<AtomicBool>);

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the request and report whether it was raised. A raise that
    /// arrives while the caller applies the effect stays pending.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}
