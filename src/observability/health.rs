// Health check system for monitoring engine health

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use super::config::HealthConfig;

/// Health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Component health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub last_check: chrono::DateTime<chrono::Utc>,
    pub check_duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Healthy,
            message: None,
            last_check: chrono::Utc::now(),
            check_duration_ms: 0,
            details: None,
        }
    }

    pub fn degraded(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Degraded,
            message: Some(message.into()),
            last_check: chrono::Utc::now(),
            check_duration_ms: 0,
            details: None,
        }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
            last_check: chrono::Utc::now(),
            check_duration_ms: 0,
            details: None,
        }
    }

    pub fn with_details(mut self, details: HashMap<String, serde_json::Value>) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        let mut details = self.details.unwrap_or_default();
        details.insert(key.into(), value);
        self.details = Some(details);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.check_duration_ms = duration_ms;
        self
    }
}

/// Health check trait
#[async_trait]
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &str;
    async fn check(&self) -> ComponentHealth;
    fn is_critical(&self) -> bool {
        false
    }
}

/// Overall system health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: Vec<ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl SystemHealth {
    pub fn determine_status(components: &[ComponentHealth], critical_names: &[String]) -> HealthStatus {
        let mut has_degraded = false;

        for component in components {
            let is_critical = critical_names.contains(&component.name);

            match component.status {
                HealthStatus::Unhealthy if is_critical => {
                    return HealthStatus::Unhealthy;
                }
                HealthStatus::Unhealthy => {
                    has_degraded = true;
                }
                HealthStatus::Degraded => {
                    has_degraded = true;
                }
                HealthStatus::Healthy => {}
            }
        }

        if has_degraded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

/// Health checker manager
pub struct HealthChecker {
    checks: Arc<RwLock<Vec<Arc<dyn HealthCheck>>>>,
    config: HealthConfig,
    start_time: Instant,
    critical_components: Arc<RwLock<Vec<String>>>,
}

impl HealthChecker {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            checks: Arc::new(RwLock::new(Vec::new())),
            config,
            start_time: Instant::now(),
            critical_components: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn register(&self, check: Arc<dyn HealthCheck>) {
        let mut checks = self.checks.write().await;

        if check.is_critical() {
            let mut critical = self.critical_components.write().await;
            critical.push(check.name().to_string());
        }

        checks.push(check);
    }

    pub async fn mark_critical(&self, component_name: impl Into<String>) {
        let mut critical = self.critical_components.write().await;
        let name = component_name.into();
        if !critical.contains(&name) {
            critical.push(name);
        }
    }

    pub async fn check_health(&self) -> SystemHealth {
        let checks = self.checks.read().await.clone();
        let critical = self.critical_components.read().await.clone();

        let check_futures: Vec<_> = checks
            .iter()
            .map(|check| async move {
                let start = Instant::now();
                let mut result = check.check().await;
                result.check_duration_ms = start.elapsed().as_millis() as u64;
                result
            })
            .collect();

        let components = futures::future::join_all(check_futures).await;

        let status = SystemHealth::determine_status(&components, &critical);

        SystemHealth {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            components,
            timestamp: chrono::Utc::now(),
        }
    }

    pub async fn check_liveness(&self) -> HealthStatus {
        HealthStatus::Healthy
    }

    pub async fn check_readiness(&self) -> HealthStatus {
        let health = self.check_health().await;

        match health.status {
            HealthStatus::Healthy | HealthStatus::Degraded => HealthStatus::Healthy,
            HealthStatus::Unhealthy => HealthStatus::Unhealthy,
        }
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }
}

/// Proxy pool health check - reports whether any non-cooldown proxy remains.
pub struct ProxyPoolHealthCheck {
    name: String,
    available: Arc<RwLock<bool>>,
}

impl ProxyPoolHealthCheck {
    pub fn new(name: impl Into<String>, available: Arc<RwLock<bool>>) -> Self {
        Self {
            name: name.into(),
            available,
        }
    }
}

#[async_trait]
impl HealthCheck for ProxyPoolHealthCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> ComponentHealth {
        if *self.available.read().await {
            ComponentHealth::healthy(&self.name).with_detail("type", serde_json::json!("proxy_pool"))
        } else {
            ComponentHealth::unhealthy(&self.name, "no proxy available in any pool")
        }
    }

    fn is_critical(&self) -> bool {
        true
    }
}

/// Rendering backend health check (static or simulated connectivity probe).
pub struct RenderingBackendHealthCheck {
    name: String,
    critical: bool,
}

impl RenderingBackendHealthCheck {
    pub fn new(name: impl Into<String>, critical: bool) -> Self {
        Self {
            name: name.into(),
            critical,
        }
    }
}

#[async_trait]
impl HealthCheck for RenderingBackendHealthCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> ComponentHealth {
        ComponentHealth::healthy(&self.name).with_detail("type", serde_json::json!("rendering_backend"))
    }

    fn is_critical(&self) -> bool {
        self.critical
    }
}

/// Custom function-based health check
pub struct FunctionHealthCheck<F>
where
    F: Fn() -> ComponentHealth + Send + Sync,
{
    name: String,
    check_fn: F,
    critical: bool,
}

impl<F> FunctionHealthCheck<F>
where
    F: Fn() -> ComponentHealth + Send + Sync,
{
    pub fn new(name: impl Into<String>, check_fn: F, critical: bool) -> Self {
        Self {
            name: name.into(),
            check_fn,
            critical,
        }
    }
}

#[async_trait]
impl<F> HealthCheck for FunctionHealthCheck<F>
where
    F: Fn() -> ComponentHealth + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> ComponentHealth {
        (self.check_fn)()
    }

    fn is_critical(&self) -> bool {
        self.critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_display() {
        assert_eq!(HealthStatus::Healthy.to_string(), "healthy");
        assert_eq!(HealthStatus::Degraded.to_string(), "degraded");
        assert_eq!(HealthStatus::Unhealthy.to_string(), "unhealthy");
    }

    #[test]
    fn test_system_health_determine_status() {
        let components = vec![ComponentHealth::healthy("db"), ComponentHealth::healthy("cache")];
        let status = SystemHealth::determine_status(&components, &[]);
        assert_eq!(status, HealthStatus::Healthy);

        let components = vec![
            ComponentHealth::healthy("proxies"),
            ComponentHealth::degraded("patterns", "slow"),
        ];
        let status = SystemHealth::determine_status(&components, &[]);
        assert_eq!(status, HealthStatus::Degraded);

        let components = vec![
            ComponentHealth::unhealthy("proxies", "down"),
            ComponentHealth::healthy("patterns"),
        ];
        let critical = vec!["proxies".to_string()];
        let status = SystemHealth::determine_status(&components, &critical);
        assert_eq!(status, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_health_checker_register_and_check() {
        let checker = HealthChecker::new(HealthConfig::default());
        let available = Arc::new(RwLock::new(true));
        checker
            .register(Arc::new(ProxyPoolHealthCheck::new("proxy_pool", available)))
            .await;

        let health = checker.check_health().await;
        assert_eq!(health.components.len(), 1);
        assert_eq!(health.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_readiness_tolerates_degraded() {
        let checker = HealthChecker::new(HealthConfig::default());
        checker
            .register(Arc::new(FunctionHealthCheck::new(
                "custom",
                || ComponentHealth::degraded("custom", "slow"),
                false,
            )))
            .await;

        assert_eq!(checker.check_readiness().await, HealthStatus::Healthy);
    }
}
