//! Per-request state machine (spec §4.1): `Init -> SelectingTier ->
//! Fetching -> Extracting -> Validating -> (Success | NextTier | Fail)`.
//! Tracked mainly for tracing/observability; the control flow in
//! [`super::Orchestrator`] mirrors it directly.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Init,
    SelectingTier,
    Fetching,
    Extracting,
    Validating,
    Success,
    NextTier,
    Fail,
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Init => "init",
            RequestState::SelectingTier => "selecting_tier",
            RequestState::Fetching => "fetching",
            RequestState::Extracting => "extracting",
            RequestState::Validating => "validating",
            RequestState::Success => "success",
            RequestState::NextTier => "next_tier",
            RequestState::Fail => "fail",
        }
    }
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_snake_case() {
        assert_eq!(RequestState::SelectingTier.to_string(), "selecting_tier");
    }
}
