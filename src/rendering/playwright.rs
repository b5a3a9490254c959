//! Playwright tier: a real browser, used only when cheaper tiers fail.
//! Launches Chromium once per backend instance and reuses the browser
//! across requests; each render opens and closes its own page.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::domain::{FetchError, Result, Tier};

use super::backend::{RenderRequest, RenderResponse, RenderingBackend};

pub struct PlaywrightBackend {
    browser: Mutex<Option<playwright::api::Browser>>,
}

impl PlaywrightBackend {
    pub fn new() -> Self {
        Self {
            browser: Mutex::new(None),
        }
    }

    async fn ensure_browser(&self) -> Result<()> {
        let mut guard = self.browser.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let playwright = playwright::Playwright::initialize().await.map_err(|e| {
            tracing::error!(error = %e, "playwright initialize failed");
            FetchError::BrowserNotInstalled
        })?;
        playwright
            .install_chromium()
            .map_err(|_| FetchError::BrowserNotInstalled)?;

        let chromium = playwright.chromium();
        let browser = chromium
            .launcher()
            .headless(true)
            .launch()
            .await
            .map_err(|e| FetchError::BrowserNavigationFailed(e.to_string()))?;

        *guard = Some(browser);
        Ok(())
    }
}

impl Default for PlaywrightBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RenderingBackend for PlaywrightBackend {
    fn tier(&self) -> Tier {
        Tier::Playwright
    }

    async fn render(&self, request: RenderRequest) -> Result<RenderResponse> {
        self.ensure_browser().await?;

        let guard = self.browser.lock().await;
        let browser = guard.as_ref().expect("browser initialized by ensure_browser");

        let context = browser
            .context_builder()
            .build()
            .await
            .map_err(|e| FetchError::BrowserNavigationFailed(e.to_string()))?;

        let page = context
            .new_page()
            .await
            .map_err(|e| FetchError::BrowserNavigationFailed(e.to_string()))?;

        page.goto_builder(&request.url)
            .timeout(request.timeout.as_millis() as f64)
            .goto()
            .await
            .map_err(|e| FetchError::BrowserNavigationFailed(e.to_string()))?;

        let final_url = page.url().map_err(|e| FetchError::BrowserNavigationFailed(e.to_string()))?;
        let body = page
            .content()
            .await
            .map_err(|e| FetchError::BrowserNavigationFailed(e.to_string()))?;

        Ok(RenderResponse {
            final_url,
            status: 200,
            headers: HashMap::new(),
            body,
            network_log: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_is_playwright() {
        assert_eq!(PlaywrightBackend::new().tier(), Tier::Playwright);
    }
}
