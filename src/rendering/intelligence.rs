//! Intelligence tier: a plain HTTP GET through `reqwest`. Cheapest tier,
//! handles any page that does not require client-side rendering.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::{FetchError, Result, Tier};

use super::backend::{RenderRequest, RenderResponse, RenderingBackend};

pub struct IntelligenceBackend {
    client: reqwest::Client,
}

impl IntelligenceBackend {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::limited(10))
                .build()
                .expect("reqwest client builds with default TLS backend"),
        }
    }

    fn build_proxied_client(&self, proxy_url: &str, timeout: Duration) -> Result<reqwest::Client> {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| FetchError::ConfigInvalidUrl(format!("invalid proxy url: {e}")))?;
        reqwest::Client::builder()
            .proxy(proxy)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::InternalError(format!("failed to build proxied client: {e}")))
    }
}

impl Default for IntelligenceBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RenderingBackend for IntelligenceBackend {
    fn tier(&self) -> Tier {
        Tier::Intelligence
    }

    async fn render(&self, request: RenderRequest) -> Result<RenderResponse> {
        let client = match &request.proxy {
            Some(proxy) => self.build_proxied_client(&proxy.url, request.timeout)?,
            None => self.client.clone(),
        };

        let mut builder = client.get(&request.url).timeout(request.timeout);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(cookies) = &request.cookies {
            builder = builder.header(reqwest::header::COOKIE, cookies);
        }

        debug!(url = %request.url, "intelligence tier requesting");

        let response = builder.send().await.map_err(classify_reqwest_error)?;

        let status = response.status();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect::<HashMap<_, _>>();

        if status.as_u16() == 404 {
            return Err(FetchError::HttpNotFound(request.url));
        }
        if status.as_u16() == 410 {
            return Err(FetchError::HttpGone(request.url));
        }
        if status.as_u16() >= 500 {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::HttpServerError {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let body = response.text().await.map_err(classify_reqwest_error)?;

        if headers.contains_key("cf-ray") || headers.contains_key("x-amz-cf-id") {
            warn!(url = %final_url, "waf header observed on intelligence tier response");
        }

        Ok(RenderResponse {
            final_url,
            status: status.as_u16(),
            headers,
            body,
            network_log: None,
        })
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::NetworkTimeout(err.to_string())
    } else if err.is_connect() {
        FetchError::NetworkConnectionRefused(err.to_string())
    } else {
        FetchError::NetworkSocketError(err.to_string())
    }
}
