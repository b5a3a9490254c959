//! The `RenderingBackend` capability and its three tier implementations
//! (spec §4.1, §6). The orchestrator selects a tier; this module performs
//! the actual IO for it.

pub mod backend;
pub mod intelligence;
pub mod lightweight;
pub mod playwright;

pub use backend::{RenderRequest, RenderResponse, RenderingBackend};
pub use intelligence::IntelligenceBackend;
pub use lightweight::LightweightBackend;
pub use playwright::PlaywrightBackend;

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::Tier;

/// Looks up the backend for a tier. Built once at startup and shared by the
/// orchestrator across all requests.
pub struct RenderingBackends {
    backends: HashMap<Tier, Arc<dyn RenderingBackend>>,
}

impl RenderingBackends {
    pub fn new(backends: HashMap<Tier, Arc<dyn RenderingBackend>>) -> Self {
        Self { backends }
    }

    /// Default set: real intelligence/lightweight backends, a playwright
    /// backend that lazily initializes its browser on first use.
    pub fn standard() -> Self {
        let mut backends: HashMap<Tier, Arc<dyn RenderingBackend>> = HashMap::new();
        backends.insert(Tier::Intelligence, Arc::new(IntelligenceBackend::new()));
        backends.insert(
            Tier::Lightweight,
            Arc::new(LightweightBackend::default()),
        );
        backends.insert(Tier::Playwright, Arc::new(PlaywrightBackend::new()));
        Self::new(backends)
    }

    pub fn get(&self, tier: Tier) -> Option<Arc<dyn RenderingBackend>> {
        self.backends.get(&tier).cloned()
    }
}
