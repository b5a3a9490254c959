//! Core entities shared by every component of the fetch engine (spec §3).

pub mod attempt;
pub mod error;
pub mod fetch_result;
pub mod pattern;
pub mod proxy;
pub mod request;
pub mod tier;
pub mod trace;

pub use attempt::{Attempt, NetworkStats, Outcome};
pub use error::{ErrorCategory, FetchError, RecommendedAction, Result};
pub use fetch_result::{FetchResult, LinkData, TableData};
pub use pattern::{
    AntiBotQuirk, DomainGroup, GroupEvidence, GroupSource, HealthSnapshot, Pattern,
    PatternExample, PatternHealth, PatternStats, PatternStatus, RateLimitQuirk,
    RecommendedPatternAction, SiteQuirks, StealthQuirk,
};
pub use proxy::{
    PerDomainHealth, Proxy, ProxyHealth, ProxyPool, ProxyTier, DomainRisk, RiskFactors, RiskLevel,
};
pub use request::{apex_domain, registered_domain, Budget, FetchOptions, GeoPrefs, Request};
pub use tier::Tier;
pub use trace::{DecisionTrace, SelectorAttempt, TitleAttempt, TitleSource};
