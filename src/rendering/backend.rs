//! The `RenderingBackend` capability (spec §6): one implementation per tier,
//! each performing the actual network/browser IO. The core depends only on
//! this trait; construction of the real backends is the caller's concern.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::domain::{Proxy, Result, Tier};

#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub url: String,
    pub proxy: Option<Proxy>,
    pub headers: HashMap<String, String>,
    pub cookies: Option<String>,
    pub timeout: Duration,
}

impl RenderRequest {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            proxy: None,
            headers: HashMap::new(),
            cookies: None,
            timeout,
        }
    }

    pub fn with_proxy(mut self, proxy: Proxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

#[derive(Debug, Clone)]
pub struct RenderResponse {
    pub final_url: String,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub network_log: Option<Vec<String>>,
}

/// One rendering strategy per tier. Implementations must not hold side
/// effects on the core's shared state — the orchestrator owns that.
#[async_trait]
pub trait RenderingBackend: Send + Sync {
    fn tier(&self) -> Tier;
    async fn render(&self, request: RenderRequest) -> Result<RenderResponse>;
}
