//! Learning subsystem (spec §4.6–§4.9): API pattern discovery, pattern
//! health monitoring, per-domain quirks, and cross-domain group learning.
//! All four share the [`events::EventBus`] so one component's output can
//! feed another without a direct dependency.

pub mod events;
pub mod groups;
pub mod pattern_health;
pub mod patterns;
pub mod quirks;
pub mod url_pattern;

pub use events::{EventBus, PatternEvent};
pub use groups::{DomainGroupLearner, GroupSuggestion};
pub use pattern_health::{HealthNotification, PatternHealthMonitor};
pub use patterns::{PatternMatch, PatternObservation, PatternRegistry};
pub use quirks::{apply_quirks_to_fetch_options, QuirksRegistry};
pub use url_pattern::{generalize_path, match_path, PatternRegexCache};
