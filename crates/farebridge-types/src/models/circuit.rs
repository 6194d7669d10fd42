//! Circuit breaker state models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// State of a provider's circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - provider receives traffic
    Closed,
    /// Cool-down elapsed - exactly one trial call may pass
    HalfOpen,
    /// Provider is failing - skipped by selection
    Open,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::HalfOpen => "half_open",
            Self::Open => "open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CircuitState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "closed" => Ok(Self::Closed),
            "half_open" => Ok(Self::HalfOpen),
            "open" => Ok(Self::Open),
            other => Err(format!("unknown circuit state: {other}")),
        }
    }
}

/// Persisted circuit breaker state, one row per provider.
///
/// `version` increases by one on every persisted mutation and is the
/// compare-and-swap token for concurrent writers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CircuitBreakerState {
    pub provider_id: String,
    pub state: CircuitState,
    /// Consecutive failures, reset on success
    pub failure_count: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    /// Cool-down deadline; set whenever `state` is `Open`
    pub reopen_after: Option<DateTime<Utc>>,
    /// Start of the current half-open trial lease, if one is in flight
    pub trial_started_at: Option<DateTime<Utc>>,
    /// Open transitions since the circuit last closed (drives backoff)
    pub consecutive_trips: u32,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl CircuitBreakerState {
    /// Fresh closed circuit.
    pub fn closed(provider_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            provider_id: provider_id.into(),
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure_at: None,
            reopen_after: None,
            trial_started_at: None,
            consecutive_trips: 0,
            version: 0,
            updated_at: now,
        }
    }

    /// Whether the open cool-down has elapsed at `now`.
    pub fn cooldown_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.state == CircuitState::Open && self.reopen_after.map_or(true, |deadline| now >= deadline)
    }

    /// Whether a half-open trial lease is currently held.
    pub fn trial_in_flight(&self, now: DateTime<Utc>, lease: Duration) -> bool {
        self.state == CircuitState::HalfOpen
            && self.trial_started_at.is_some_and(|started| now < started + lease)
    }

    /// Closed, or half-open with no live trial.
    pub fn is_eligible(&self, now: DateTime<Utc>, lease: Duration) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => !self.trial_in_flight(now, lease),
            CircuitState::Open => false,
        }
    }

    /// Seconds until the open circuit may be retried.
    pub fn cooldown_remaining_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        match (self.state, self.reopen_after) {
            (CircuitState::Open, Some(deadline)) => Some((deadline - now).num_seconds().max(0)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_open_eligibility_respects_lease() {
        let now = Utc::now();
        let lease = Duration::seconds(60);
        let mut state = CircuitBreakerState::closed("a", now);
        assert!(state.is_eligible(now, lease));

        state.state = CircuitState::HalfOpen;
        assert!(state.is_eligible(now, lease));

        state.trial_started_at = Some(now);
        assert!(!state.is_eligible(now, lease));
        assert!(state.is_eligible(now + Duration::seconds(61), lease));
    }

    #[test]
    fn test_cooldown_elapsed() {
        let now = Utc::now();
        let mut state = CircuitBreakerState::closed("a", now);
        state.state = CircuitState::Open;
        state.reopen_after = Some(now + Duration::seconds(30));

        assert!(!state.cooldown_elapsed(now));
        assert_eq!(state.cooldown_remaining_seconds(now), Some(30));
        assert!(state.cooldown_elapsed(now + Duration::seconds(30)));
    }

    #[test]
    fn test_state_round_trips_through_str() {
        for state in [CircuitState::Closed, CircuitState::HalfOpen, CircuitState::Open] {
            assert_eq!(state.as_str().parse::<CircuitState>(), Ok(state));
        }
    }
}
