use serde::{Deserialize, Serialize};

/// Stable error categories surfaced to callers (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Http,
    RateLimit,
    Auth,
    Security,
    Blocked,
    Content,
    Validation,
    Browser,
    SiteChange,
    Config,
    Internal,
}

/// A recommended follow-up action, drawn from the fixed vocabulary in spec §7.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecommendedAction {
    Retry,
    IncreaseTimeout,
    WaitAndRetry { delay_ms: u64 },
    UseBrowserTier,
    RefreshSession,
    ManualIntervention,
    UsePublicUrl,
    CheckParameters,
    BrowseFresh,
    InstallPlaywright,
}

/// Top-level error type for the fetch engine.
///
/// Every variant maps to exactly one [`ErrorCategory`] and carries whether it
/// is retryable across tiers, per the propagation policy in spec §7.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchError {
    #[error("network timeout: {0}")]
    NetworkTimeout(String),
    #[error("connection refused: {0}")]
    NetworkConnectionRefused(String),
    #[error("dns failure: {0}")]
    NetworkDnsFailure(String),
    #[error("socket error: {0}")]
    NetworkSocketError(String),
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("not found: {0}")]
    HttpNotFound(String),
    #[error("gone: {0}")]
    HttpGone(String),
    #[error("server error {status}: {message}")]
    HttpServerError { status: u16, message: String },
    #[error("bad gateway: {0}")]
    HttpBadGateway(String),
    #[error("service unavailable: {0}")]
    HttpServiceUnavailable(String),
    #[error("gateway timeout: {0}")]
    HttpGatewayTimeout(String),

    #[error("rate limit exceeded on {domain}")]
    RateLimitExceeded { domain: String },

    #[error("auth credentials invalid")]
    AuthCredentialsInvalid,
    #[error("auth session expired")]
    AuthSessionExpired,
    #[error("auth credentials missing")]
    AuthCredentialsMissing,

    #[error("request targets a private IP")]
    SecurityPrivateIp,
    #[error("request targets localhost")]
    SecurityLocalhost,
    #[error("blocked protocol: {0}")]
    SecurityBlockedProtocol(String),

    #[error("captcha challenge encountered")]
    BlockedCaptcha,
    #[error("challenge page encountered")]
    BlockedChallengePage,
    #[error("bot detection triggered")]
    BlockedBotDetection,

    #[error("content empty")]
    ContentEmpty,
    #[error("content requires javascript")]
    ContentRequiresJs,
    #[error("content extraction failed: {0}")]
    ContentExtractionFailed(String),

    #[error("incomplete render")]
    ValidationIncompleteRender,

    #[error("browser not installed")]
    BrowserNotInstalled,
    #[error("browser element not found: {0}")]
    BrowserElementNotFound(String),
    #[error("browser navigation failed: {0}")]
    BrowserNavigationFailed(String),

    #[error("selectors outdated for {domain}")]
    SiteSelectorsOutdated { domain: String },
    #[error("site structure changed for {domain}")]
    SiteStructureChanged { domain: String },

    #[error("missing argument: {0}")]
    ConfigMissingArgument(String),
    #[error("unknown tool: {0}")]
    ConfigUnknownTool(String),
    #[error("invalid url: {0}")]
    ConfigInvalidUrl(String),

    #[error("no proxy available{hint}", hint = .hint.as_deref().map(|h| format!(" ({h})")).unwrap_or_default())]
    NoProxyAvailable { hint: Option<String> },

    #[error("internal error: {0}")]
    InternalError(String),
    #[error("internal skill error: {0}")]
    InternalSkillError(String),
}

impl FetchError {
    pub fn category(&self) -> ErrorCategory {
        use FetchError::*;
        match self {
            NetworkTimeout(_)
            | NetworkConnectionRefused(_)
            | NetworkDnsFailure(_)
            | NetworkSocketError(_)
            | NetworkUnreachable(_) => ErrorCategory::Network,

            HttpNotFound(_)
            | HttpGone(_)
            | HttpServerError { .. }
            | HttpBadGateway(_)
            | HttpServiceUnavailable(_)
            | HttpGatewayTimeout(_) => ErrorCategory::Http,

            RateLimitExceeded { .. } => ErrorCategory::RateLimit,

            AuthCredentialsInvalid | AuthSessionExpired | AuthCredentialsMissing => {
                ErrorCategory::Auth
            }

            SecurityPrivateIp | SecurityLocalhost | SecurityBlockedProtocol(_) => {
                ErrorCategory::Security
            }

            BlockedCaptcha | BlockedChallengePage | BlockedBotDetection => ErrorCategory::Blocked,

            ContentEmpty | ContentRequiresJs | ContentExtractionFailed(_) => ErrorCategory::Content,

            ValidationIncompleteRender => ErrorCategory::Validation,

            BrowserNotInstalled | BrowserElementNotFound(_) | BrowserNavigationFailed(_) => {
                ErrorCategory::Browser
            }

            SiteSelectorsOutdated { .. } | SiteStructureChanged { .. } => ErrorCategory::SiteChange,

            ConfigMissingArgument(_) | ConfigUnknownTool(_) | ConfigInvalidUrl(_) => {
                ErrorCategory::Config
            }

            NoProxyAvailable { .. } => ErrorCategory::Internal,

            InternalError(_) | InternalSkillError(_) => ErrorCategory::Internal,
        }
    }

    /// Whether this error may be retried against a higher tier.
    ///
    /// `security`, `config`, and `site_change` are fatal for the request
    /// (spec §7 propagation policy); everything else is retryable unless it
    /// is a semantic failure the spec calls out explicitly (`HttpNotFound`,
    /// `HttpGone`).
    pub fn retryable(&self) -> bool {
        use FetchError::*;
        match self.category() {
            ErrorCategory::Security | ErrorCategory::Config | ErrorCategory::SiteChange => false,
            ErrorCategory::Http => !matches!(self, HttpNotFound(_) | HttpGone(_)),
            _ => true,
        }
    }

    pub fn recommended_actions(&self) -> Vec<RecommendedAction> {
        use FetchError::*;
        match self {
            NetworkTimeout(_) | HttpGatewayTimeout(_) => {
                vec![RecommendedAction::IncreaseTimeout, RecommendedAction::Retry]
            }
            NetworkConnectionRefused(_) | NetworkDnsFailure(_) | NetworkSocketError(_)
            | NetworkUnreachable(_) | HttpBadGateway(_) | HttpServiceUnavailable(_)
            | HttpServerError { .. } => vec![RecommendedAction::Retry],
            RateLimitExceeded { .. } => vec![RecommendedAction::WaitAndRetry { delay_ms: 2000 }],
            AuthSessionExpired => vec![RecommendedAction::RefreshSession],
            AuthCredentialsInvalid | AuthCredentialsMissing => {
                vec![RecommendedAction::ManualIntervention]
            }
            SecurityPrivateIp | SecurityLocalhost | SecurityBlockedProtocol(_) => {
                vec![RecommendedAction::ManualIntervention]
            }
            BlockedCaptcha | BlockedChallengePage | BlockedBotDetection => {
                vec![RecommendedAction::UseBrowserTier, RecommendedAction::ManualIntervention]
            }
            ContentRequiresJs => vec![RecommendedAction::UseBrowserTier],
            ContentEmpty | ContentExtractionFailed(_) => {
                vec![RecommendedAction::BrowseFresh, RecommendedAction::UseBrowserTier]
            }
            ValidationIncompleteRender => vec![RecommendedAction::UseBrowserTier],
            BrowserNotInstalled => vec![RecommendedAction::InstallPlaywright],
            BrowserElementNotFound(_) | BrowserNavigationFailed(_) => {
                vec![RecommendedAction::Retry, RecommendedAction::UseBrowserTier]
            }
            SiteSelectorsOutdated { .. } | SiteStructureChanged { .. } => {
                vec![RecommendedAction::ManualIntervention]
            }
            ConfigMissingArgument(_) | ConfigUnknownTool(_) | ConfigInvalidUrl(_) => {
                vec![RecommendedAction::CheckParameters]
            }
            NoProxyAvailable { .. } => vec![RecommendedAction::ManualIntervention, RecommendedAction::UsePublicUrl],
            HttpNotFound(_) | HttpGone(_) => vec![],
            InternalError(_) | InternalSkillError(_) => vec![RecommendedAction::ManualIntervention],
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::InternalError(format!("serialization failed: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
