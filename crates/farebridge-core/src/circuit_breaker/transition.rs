//! Pure state transitions. Each function returns the next row (version
//! bumped) or `None` when nothing changes and no write is needed.

use chrono::{DateTime, Utc};
use farebridge_types::models::config::CircuitBreakerConfig;
use farebridge_types::models::{CircuitBreakerState, CircuitState};

fn bumped(current: &CircuitBreakerState, now: DateTime<Utc>) -> CircuitBreakerState {
    let mut next = current.clone();
    next.version = current.version + 1;
    next.updated_at = now;
    next
}

fn trip(next: &mut CircuitBreakerState, config: &CircuitBreakerConfig, now: DateTime<Utc>) {
    next.state = CircuitState::Open;
    next.consecutive_trips = next.consecutive_trips.saturating_add(1);
    next.reopen_after = Some(now + config.open_duration_for_trip(next.consecutive_trips));
    next.trial_started_at = None;
}

/// Open with an elapsed deadline becomes half-open with no trial claimed.
pub(crate) fn promote(current: &CircuitBreakerState, now: DateTime<Utc>) -> Option<CircuitBreakerState> {
    if !current.cooldown_elapsed(now) {
        return None;
    }
    let mut next = bumped(current, now);
    next.state = CircuitState::HalfOpen;
    next.trial_started_at = None;
    Some(next)
}

/// Apply one success or failure. An elapsed open circuit is promoted first,
/// so the outcome is judged as the half-open trial.
pub(crate) fn apply_outcome(
    current: &CircuitBreakerState,
    success: bool,
    config: &CircuitBreakerConfig,
    now: DateTime<Utc>,
) -> Option<CircuitBreakerState> {
    let promoted = promote(current, now);
    let base = promoted.as_ref().unwrap_or(current);

    let mut next = match (base.state, success) {
        (CircuitState::Closed, true) => {
            if base.failure_count == 0 && base.consecutive_trips == 0 {
                return promoted;
            }
            let mut next = bumped(current, now);
            next.failure_count = 0;
            next.consecutive_trips = 0;
            next
        },
        (CircuitState::Closed, false) => {
            let mut next = bumped(current, now);
            next.failure_count = base.failure_count.saturating_add(1);
            next.last_failure_at = Some(now);
            if next.failure_count >= config.failure_threshold {
                trip(&mut next, config, now);
            }
            next
        },
        (CircuitState::HalfOpen, true) => {
            let mut next = bumped(current, now);
            next.state = CircuitState::Closed;
            next.failure_count = 0;
            next.consecutive_trips = 0;
            next.reopen_after = None;
            next.trial_started_at = None;
            next
        },
        (CircuitState::HalfOpen, false) => {
            let mut next = bumped(current, now);
            next.failure_count = base.failure_count.saturating_add(1);
            next.last_failure_at = Some(now);
            trip(&mut next, config, now);
            next
        },
        // Cool-down still running: a stray success is ignored
        (CircuitState::Open, true) => return None,
        (CircuitState::Open, false) => {
            let mut next = bumped(current, now);
            next.failure_count = base.failure_count.saturating_add(1);
            next.last_failure_at = Some(now);
            next
        },
    };
    // Only one version step per write regardless of promotion.
    next.version = current.version + 1;
    Some(next)
}

/// Claim the single half-open trial. Returns `None` if the circuit is
/// closed, still cooling down, or another trial lease is live.
pub(crate) fn claim_trial(
    current: &CircuitBreakerState,
    config: &CircuitBreakerConfig,
    now: DateTime<Utc>,
) -> Option<CircuitBreakerState> {
    let base = promote(current, now).unwrap_or_else(|| current.clone());
    if base.state != CircuitState::HalfOpen || base.trial_in_flight(now, config.trial_lease()) {
        return None;
    }
    let mut next = bumped(current, now);
    next.state = CircuitState::HalfOpen;
    next.trial_started_at = Some(now);
    Some(next)
}

/// Drop a half-open trial lease that outlived `trial_lease`.
pub(crate) fn release_abandoned_trial(
    current: &CircuitBreakerState,
    config: &CircuitBreakerConfig,
    now: DateTime<Utc>,
) -> Option<CircuitBreakerState> {
    let abandoned = current.state == CircuitState::HalfOpen
        && current.trial_started_at.is_some()
        && !current.trial_in_flight(now, config.trial_lease());
    if !abandoned {
        return None;
    }
    let mut next = bumped(current, now);
    next.trial_started_at = None;
    Some(next)
}

/// Operator reset to a clean closed circuit.
pub(crate) fn force_close(
    current: &CircuitBreakerState,
    now: DateTime<Utc>,
) -> Option<CircuitBreakerState> {
    let clean = current.state == CircuitState::Closed
        && current.failure_count == 0
        && current.consecutive_trips == 0
        && current.reopen_after.is_none()
        && current.trial_started_at.is_none();
    if clean {
        return None;
    }
    let mut next = bumped(current, now);
    next.state = CircuitState::Closed;
    next.failure_count = 0;
    next.consecutive_trips = 0;
    next.reopen_after = None;
    next.trial_started_at = None;
    Some(next)
}
