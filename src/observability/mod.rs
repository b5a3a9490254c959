//! Observability: structured logging, tracing spans, Prometheus metrics, and
//! health checks for the fetch engine.

pub mod config;
pub mod health;
pub mod metrics;
pub mod tracing;

pub use config::{
    HealthConfig, LoggingConfig, LoggingFormat, MetricsConfig, ObservabilityConfig, TracingConfig,
    TracingFormat,
};
pub use health::{
    ComponentHealth, FunctionHealthCheck, HealthCheck, HealthChecker, HealthStatus,
    ProxyPoolHealthCheck, RenderingBackendHealthCheck, SystemHealth,
};
pub use metrics::{start_timer, MetricsError, MetricsRegistry, Timer};
pub use tracing::{init_tracing, CorrelationId, RequestId, TraceContext};
