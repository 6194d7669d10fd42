//! Quota data models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Usage tier derived from `percentage_used`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaStatus {
    Healthy,
    Warning,
    Critical,
    /// Treated by selection exactly like an open circuit
    Exceeded,
}

impl QuotaStatus {
    /// Map a usage percentage onto its band. This is the only constructor of
    /// a status; records never store one independently.
    pub fn from_percentage(percentage_used: f64, thresholds: &QuotaThresholds) -> Self {
        if percentage_used >= thresholds.exceeded_pct {
            Self::Exceeded
        } else if percentage_used >= thresholds.critical_pct {
            Self::Critical
        } else if percentage_used >= thresholds.warning_pct {
            Self::Warning
        } else {
            Self::Healthy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Exceeded => "exceeded",
        }
    }
}

impl fmt::Display for QuotaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuotaStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(Self::Healthy),
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            "exceeded" => Ok(Self::Exceeded),
            other => Err(format!("unknown quota status: {other}")),
        }
    }
}

/// Percentage bands for quota status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuotaThresholds {
    /// Warning at or above this percentage (default: 75)
    pub warning_pct: f64,
    /// Critical at or above this percentage (default: 90)
    pub critical_pct: f64,
    /// Exceeded at or above this percentage (default: 100)
    pub exceeded_pct: f64,
}

impl Default for QuotaThresholds {
    fn default() -> Self {
        Self { warning_pct: 75.0, critical_pct: 90.0, exceeded_pct: 100.0 }
    }
}

/// Quota consumption for one provider within its rolling window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuotaRecord {
    pub provider_id: String,
    pub service_type: super::ServiceType,
    pub quota_limit: i64,
    pub quota_used: i64,
    /// End of the current window
    pub reset_at: DateTime<Utc>,
    pub window_seconds: i64,
    /// `false` when `quota_limit` is an operator estimate, not the vendor's number
    pub is_actual_quota_limit: bool,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl QuotaRecord {
    pub fn new(
        provider_id: impl Into<String>,
        service_type: super::ServiceType,
        quota_limit: i64,
        window_seconds: i64,
        is_actual_quota_limit: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            service_type,
            quota_limit,
            quota_used: 0,
            reset_at: now + Duration::seconds(window_seconds.max(1)),
            window_seconds,
            is_actual_quota_limit,
            version: 0,
            updated_at: now,
        }
    }

    /// `quota_used / quota_limit * 100`. A non-positive limit counts as fully used.
    pub fn percentage_used(&self) -> f64 {
        if self.quota_limit <= 0 {
            return 100.0;
        }
        // Multiply first so exact band boundaries stay exact.
        self.quota_used as f64 * 100.0 / self.quota_limit as f64
    }

    pub fn status(&self, thresholds: &QuotaThresholds) -> QuotaStatus {
        QuotaStatus::from_percentage(self.percentage_used(), thresholds)
    }

    pub fn remaining(&self) -> i64 {
        (self.quota_limit - self.quota_used).max(0)
    }

    pub fn window_elapsed(&self, now: DateTime<Utc>) -> bool {
        now >= self.reset_at
    }
}
