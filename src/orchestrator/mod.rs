//! Tiered Fetch Orchestrator (spec §4.1): the core request loop. Selects a
//! tier sequence, attempts each tier in order until one yields a valid
//! extraction or every tier is exhausted, recording a full decision trace
//! either way.

pub mod security;
pub mod sequence;
pub mod state;

pub use sequence::{select_tier_sequence, should_skip_by_budget, LearnedPreference};
pub use state::RequestState;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::Config;
use crate::domain::{
    Attempt, DecisionTrace, FetchError, FetchResult, NetworkStats, Outcome, Request, Result, RiskLevel,
};
use crate::extract::{extract, validate, ValidationOutcome};
use crate::learning::{
    apply_quirks_to_fetch_options, PatternHealthMonitor, PatternObservation, PatternRegistry, QuirksRegistry,
};
use crate::proxy::{DomainRiskClassifier, ProxyManager};
use crate::rendering::{RenderRequest, RenderingBackends};
use crate::storage::{DomainRiskRepository, GroupRepository, PatternRepository, ProxyHealthRepository, QuirksRepository};
use crate::trace::DebugRecorder;

/// Returned when a request exhausts every tier without success; carries the
/// full trace so the caller can inspect exactly what was tried (spec §7:
/// "no partial Result ever returned", full trace surfaced on total failure).
#[derive(Debug)]
pub struct OrchestratorFailure {
    pub error: FetchError,
    pub trace: DecisionTrace,
}

impl std::fmt::Display for OrchestratorFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for OrchestratorFailure {}

pub struct Orchestrator<Repo>
where
    Repo: ProxyHealthRepository + DomainRiskRepository + PatternRepository + QuirksRepository + GroupRepository,
{
    config: Arc<Config>,
    proxy_manager: Arc<ProxyManager<Repo>>,
    risk_classifier: Arc<DomainRiskClassifier<Repo>>,
    pattern_registry: Arc<PatternRegistry<Repo>>,
    pattern_health: Arc<PatternHealthMonitor<Repo>>,
    quirks_registry: Arc<QuirksRegistry<Repo>>,
    rendering: Arc<RenderingBackends>,
    debug_recorder: Arc<DebugRecorder>,
}

impl<Repo> Orchestrator<Repo>
where
    Repo: ProxyHealthRepository + DomainRiskRepository + PatternRepository + QuirksRepository + GroupRepository,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<Config>,
        proxy_manager: Arc<ProxyManager<Repo>>,
        risk_classifier: Arc<DomainRiskClassifier<Repo>>,
        pattern_registry: Arc<PatternRegistry<Repo>>,
        pattern_health: Arc<PatternHealthMonitor<Repo>>,
        quirks_registry: Arc<QuirksRegistry<Repo>>,
        rendering: Arc<RenderingBackends>,
        debug_recorder: Arc<DebugRecorder>,
    ) -> Self {
        Self {
            config,
            proxy_manager,
            risk_classifier,
            pattern_registry,
            pattern_health,
            quirks_registry,
            rendering,
            debug_recorder,
        }
    }

    pub async fn fetch(&self, request: &Request) -> std::result::Result<FetchResult, OrchestratorFailure> {
        let mut trace = DecisionTrace::new(&request.domain);
        let started = Instant::now();

        match self.run(request, &mut trace).await {
            Ok(result) => {
                self.debug_recorder
                    .record(&result.decision_trace, true, Some(result.tier_used))
                    .await
                    .ok();
                info!(domain = %request.domain, tier = %result.tier_used, elapsed_ms = started.elapsed().as_millis() as u64, "fetch succeeded");
                Ok(result)
            }
            Err(error) => {
                trace.finish(false, None);
                self.debug_recorder.record(&trace, false, None).await.ok();
                warn!(domain = %request.domain, error = %error, "fetch failed on every attempted tier");
                Err(OrchestratorFailure { error, trace })
            }
        }
    }

    async fn run(&self, request: &Request, trace: &mut DecisionTrace) -> Result<FetchResult> {
        security::check_url_security(&request.url)?;

        let risk = self.risk_classifier.get(&request.domain).await?;
        let learned = self.learned_preference(&request.domain).await?;
        let max_cost_tier = request
            .budget
            .as_ref()
            .and_then(|b| b.max_cost_tier)
            .or(self.config.budgets.max_cost_tier_default);

        let sequence = select_tier_sequence(
            request.tier_hint,
            risk.risk_level,
            risk.recommended_proxy_tier,
            learned,
            max_cost_tier,
        );

        let max_latency_ms = request
            .budget
            .as_ref()
            .and_then(|b| b.max_latency_ms)
            .or(self.config.budgets.max_latency_ms_default);

        let quirks = self.quirks_registry.get(&request.domain).await?;
        let mut spent_ms: u64 = 0;
        let mut last_error: Option<FetchError> = None;
        let mut recent_statuses: Vec<u16> = Vec::new();

        for tier in sequence {
            let remaining = sequence::remaining_budget_ms(max_latency_ms, spent_ms);
            if should_skip_by_budget(remaining, tier) {
                trace.record_attempt(Attempt {
                    tier,
                    started_at: chrono::Utc::now(),
                    duration_ms: 0,
                    outcome: Outcome::SkippedByBudget,
                    error: None,
                    proxy_id: None,
                    network_stats: NetworkStats::default(),
                });
                continue;
            }

            let attempt_started = Instant::now();
            let attempt_start_time = chrono::Utc::now();

            let proxy = match self
                .proxy_manager
                .get_proxy(&request.plan, &request.domain, risk.recommended_proxy_tier, None)
                .await
            {
                Ok(proxy) => Some(proxy),
                Err(err @ FetchError::NoProxyAvailable { .. }) => {
                    last_error = Some(err);
                    break;
                }
                Err(err) => {
                    last_error = Some(err);
                    continue;
                }
            };

            let timeout_ms = request
                .options
                .timeout_ms
                .unwrap_or(self.config.timeouts.per_tier_attempt_ms);

            let options = apply_quirks_to_fetch_options(&quirks, request.options.clone());
            let mut render_request = RenderRequest::new(request.url.clone(), std::time::Duration::from_millis(timeout_ms))
                .with_headers(options.headers.clone());
            render_request.cookies = options.cookies.clone();
            if let Some(proxy) = &proxy {
                render_request = render_request.with_proxy(proxy.clone());
            }

            let backend = match self.rendering.get(tier) {
                Some(backend) => backend,
                None => {
                    last_error = Some(FetchError::InternalError(format!("no rendering backend for tier {tier}")));
                    continue;
                }
            };

            let render_outcome = backend.render(render_request).await;
            let duration_ms = attempt_started.elapsed().as_millis() as u64;
            spent_ms += duration_ms;

            match render_outcome {
                Ok(response) => {
                    recent_statuses.push(response.status);
                    self.risk_classifier
                        .observe(&request.domain, &response.headers, response.status, &recent_statuses, &HashMap::new())
                        .await
                        .ok();

                    if response.status == 429 || response.status == 403 {
                        if let Some(proxy) = &proxy {
                            self.proxy_manager.report_failure(&proxy.id, &request.domain).await.ok();
                        }

                        let error = if response.status == 429 {
                            self.quirks_registry.learn_rate_limit(&request.domain).await.ok();
                            FetchError::RateLimitExceeded { domain: request.domain.clone() }
                        } else {
                            self.quirks_registry
                                .learn_stealth_required(&request.domain, "http_403")
                                .await
                                .ok();
                            FetchError::BlockedBotDetection
                        };

                        trace.record_attempt(Attempt {
                            tier,
                            started_at: attempt_start_time,
                            duration_ms,
                            outcome: Outcome::Blocked,
                            error: Some(error.clone()),
                            proxy_id: proxy.as_ref().map(|p| p.id.clone()),
                            network_stats: NetworkStats {
                                bytes_downloaded: response.body.len() as u64,
                                status_code: Some(response.status),
                                redirects: 0,
                            },
                        });
                        last_error = Some(error);
                        continue;
                    }

                    if let Some(proxy) = &proxy {
                        self.proxy_manager
                            .report_success(&proxy.id, &request.domain, duration_ms)
                            .await
                            .ok();
                    }

                    let extraction = extract(&response.body, &response.final_url, tier, &request.domain);
                    let validation = validate(&extraction, tier, &request.domain);

                    match validation {
                        ValidationOutcome::Valid { .. } => {
                            for fragment in &extraction.decision_trace.title {
                                trace.record_title(fragment.clone());
                            }
                            for fragment in &extraction.decision_trace.selectors {
                                trace.record_selector(fragment.clone());
                            }
                            trace.record_attempt(Attempt {
                                tier,
                                started_at: attempt_start_time,
                                duration_ms,
                                outcome: Outcome::Success,
                                error: None,
                                proxy_id: proxy.as_ref().map(|p| p.id.clone()),
                                network_stats: NetworkStats {
                                    bytes_downloaded: response.body.len() as u64,
                                    status_code: Some(response.status),
                                    redirects: 0,
                                },
                            });
                            trace.finish(true, Some(tier));

                            let endpoint_path = url::Url::parse(&response.final_url)
                                .map(|u| u.path().to_string())
                                .unwrap_or_else(|_| response.final_url.clone());
                            let observation = PatternObservation {
                                domain: request.domain.clone(),
                                endpoint_path,
                                method: "GET".to_string(),
                                response_shape: None,
                            };
                            if let Ok(pattern) = self.pattern_registry.record(observation).await {
                                self.pattern_health.record_use(pattern, true).await.ok();
                            }

                            let mut result = extraction;
                            result.decision_trace = trace.clone();
                            result.tier_used = tier;
                            result.fell_back = trace.fell_back();
                            return Ok(result);
                        }
                        ValidationOutcome::Retryable { reasons } => {
                            trace.record_attempt(Attempt {
                                tier,
                                started_at: attempt_start_time,
                                duration_ms,
                                outcome: Outcome::ValidationFailed,
                                error: None,
                                proxy_id: proxy.as_ref().map(|p| p.id.clone()),
                                network_stats: NetworkStats {
                                    bytes_downloaded: response.body.len() as u64,
                                    status_code: Some(response.status),
                                    redirects: 0,
                                },
                            });
                            last_error = Some(FetchError::ValidationIncompleteRender);
                            let _ = reasons;
                            continue;
                        }
                        ValidationOutcome::Fatal { .. } => {
                            trace.record_attempt(Attempt {
                                tier,
                                started_at: attempt_start_time,
                                duration_ms,
                                outcome: Outcome::Blocked,
                                error: None,
                                proxy_id: proxy.as_ref().map(|p| p.id.clone()),
                                network_stats: NetworkStats::default(),
                            });
                            return Err(FetchError::ContentExtractionFailed("fatal validation failure".to_string()));
                        }
                    }
                }
                Err(error) => {
                    if let Some(proxy) = &proxy {
                        self.proxy_manager.report_failure(&proxy.id, &request.domain).await.ok();
                    }

                    let outcome = match error.category() {
                        crate::domain::ErrorCategory::Network => Outcome::TransportError,
                        crate::domain::ErrorCategory::Blocked => Outcome::Blocked,
                        _ => Outcome::TransportError,
                    };

                    trace.record_attempt(Attempt {
                        tier,
                        started_at: attempt_start_time,
                        duration_ms,
                        outcome,
                        error: Some(error.clone()),
                        proxy_id: proxy.as_ref().map(|p| p.id.clone()),
                        network_stats: NetworkStats::default(),
                    });

                    let fatal = !error.retryable();
                    last_error = Some(error);
                    if fatal {
                        break;
                    }
                    continue;
                }
            }
        }

        Err(last_error.unwrap_or(FetchError::InternalError("no tiers attempted".to_string())))
    }

    /// Approximates spec §4.1 step 4's "learned preference": the domain's
    /// strongest pattern, if it has a track record good enough to steer
    /// tier selection.
    async fn learned_preference(&self, domain: &str) -> Result<Option<LearnedPreference>> {
        let patterns = self.pattern_registry.patterns_for_domain(domain).await?;
        Ok(patterns
            .into_iter()
            .filter_map(|p| {
                let tier = p.preferred_tier?;
                let rate = p.health.current_success_rate;
                Some(LearnedPreference {
                    tier,
                    successes_last_24h: p.stats.successes.min(u32::MAX as u64) as u32,
                    success_rate: rate,
                })
            })
            .find(|pref| pref.qualifies()))
    }

    pub fn proxy_manager(&self) -> &Arc<ProxyManager<Repo>> {
        &self.proxy_manager
    }

    pub fn risk_classifier(&self) -> &Arc<DomainRiskClassifier<Repo>> {
        &self.risk_classifier
    }

    pub fn pattern_registry(&self) -> &Arc<PatternRegistry<Repo>> {
        &self.pattern_registry
    }

    pub fn pattern_health(&self) -> &Arc<PatternHealthMonitor<Repo>> {
        &self.pattern_health
    }

    pub fn debug_recorder(&self) -> &Arc<DebugRecorder> {
        &self.debug_recorder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_ordering_sane() {
        assert!(RiskLevel::Low < RiskLevel::Extreme);
    }
}
