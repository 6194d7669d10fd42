//! Provider registry models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, RoutingError};

/// Kind of travel inventory a supplier API serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Flight,
    Hotel,
    Activity,
}

impl ServiceType {
    pub const ALL: [ServiceType; 3] = [Self::Flight, Self::Hotel, Self::Activity];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flight => "flight",
            Self::Hotel => "hotel",
            Self::Activity => "activity",
        }
    }

    /// Capitalized label for user-facing messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Flight => "Flight",
            Self::Hotel => "Hotel",
            Self::Activity => "Activity",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flight" | "flights" => Ok(Self::Flight),
            "hotel" | "hotels" => Ok(Self::Hotel),
            "activity" | "activities" => Ok(Self::Activity),
            _ => Err(RoutingError::InvalidServiceType { value: s.to_string() }),
        }
    }
}

/// An upstream travel-supplier API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provider {
    /// Stable identifier, e.g. `"amadeus-flights"`
    pub id: String,
    pub service_type: ServiceType,
    /// Operator switch; disabled providers never receive traffic
    pub enabled: bool,
    /// Lower number is tried first
    pub priority: i32,
    pub base_url: String,
    /// Path appended to `base_url` for lightweight health probes
    #[serde(default)]
    pub health_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Provider {
    /// URL the health monitor probes.
    pub fn probe_url(&self) -> String {
        match self.health_path.as_deref() {
            Some(path) if !path.is_empty() => {
                format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
            },
            _ => self.base_url.clone(),
        }
    }
}

/// Declarative provider definition, from configuration or the admin API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderSeed {
    pub id: String,
    pub service_type: ServiceType,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_priority")]
    pub priority: i32,
    pub base_url: String,
    #[serde(default)]
    pub health_path: Option<String>,
    /// Vendor quota per window; falls back to `quota.default_limit`
    #[serde(default)]
    pub quota_limit: Option<i64>,
    /// Whether `quota_limit` is the vendor's published number or an estimate
    #[serde(default)]
    pub is_actual_quota_limit: bool,
    /// Quota window length; falls back to `quota.default_window_seconds`
    #[serde(default)]
    pub quota_window_seconds: Option<i64>,
}

impl ProviderSeed {
    /// Reject seeds whose state rows could not be written or would never
    /// route traffic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::invalid("providers.id", "provider id must not be empty"));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::invalid(
                "providers.base_url",
                format!("provider '{}' has no base_url", self.id),
            ));
        }
        if self.quota_limit.is_some_and(|limit| limit < 0) {
            return Err(ConfigError::invalid(
                "providers.quota_limit",
                format!("provider '{}' has a negative quota limit", self.id),
            ));
        }
        if self.quota_window_seconds.is_some_and(|window| window <= 0) {
            return Err(ConfigError::invalid(
                "providers.quota_window_seconds",
                format!("provider '{}' needs a positive quota window", self.id),
            ));
        }
        Ok(())
    }
}

fn default_enabled() -> bool {
    true
}

fn default_priority() -> i32 {
    100
}

/// Operator-controlled fields that may change after registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderUpdate {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub health_path: Option<String>,
}

impl ProviderUpdate {
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none()
            && self.priority.is_none()
            && self.base_url.is_none()
            && self.health_path.is_none()
    }

    /// Apply the update, returning whether anything changed.
    pub fn apply_to(&self, provider: &mut Provider) -> bool {
        let mut changed = false;
        if let Some(enabled) = self.enabled {
            changed |= provider.enabled != enabled;
            provider.enabled = enabled;
        }
        if let Some(priority) = self.priority {
            changed |= provider.priority != priority;
            provider.priority = priority;
        }
        if let Some(ref base_url) = self.base_url {
            changed |= &provider.base_url != base_url;
            provider.base_url.clone_from(base_url);
        }
        if let Some(ref health_path) = self.health_path {
            changed |= provider.health_path.as_ref() != Some(health_path);
            provider.health_path = Some(health_path.clone());
        }
        changed
    }
}
