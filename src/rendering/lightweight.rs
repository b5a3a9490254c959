//! Lightweight tier: an HTTP fetch followed by a short settle wait and a
//! second fetch, approximating "minimal script execution" for pages that
//! finish hydrating shortly after the initial response (a common case for
//! SSR frameworks that stream an interactive shell). More capable than the
//! intelligence tier, far cheaper than a full browser.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::domain::{Result, Tier};

use super::backend::{RenderRequest, RenderResponse, RenderingBackend};
use super::intelligence::IntelligenceBackend;

pub struct LightweightBackend {
    inner: IntelligenceBackend,
    settle_delay: Duration,
}

impl LightweightBackend {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            inner: IntelligenceBackend::new(),
            settle_delay,
        }
    }
}

impl Default for LightweightBackend {
    fn default() -> Self {
        Self::new(Duration::from_millis(400))
    }
}

#[async_trait]
impl RenderingBackend for LightweightBackend {
    fn tier(&self) -> Tier {
        Tier::Lightweight
    }

    async fn render(&self, request: RenderRequest) -> Result<RenderResponse> {
        let first = self.inner.render(request.clone()).await?;

        if !looks_like_loading_shell(&first.body) {
            return Ok(first);
        }

        debug!(url = %request.url, "lightweight tier re-fetching after settle delay");
        tokio::time::sleep(self.settle_delay).await;
        self.inner.render(request).await
    }
}

/// Heuristic for a client-rendered shell that hasn't hydrated yet: very
/// short body, or a known placeholder marker.
fn looks_like_loading_shell(body: &str) -> bool {
    let trimmed = body.trim();
    if trimmed.len() < 200 {
        return true;
    }
    let lowered = trimmed.to_lowercase();
    lowered.contains("loading...") || lowered.contains("please wait") || lowered.contains("enable javascript")
}
