use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rollout: Rollout,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rollout {
    /// Salts the percentile assignment. Zero means "pick one at creation".
    #[serde(default)]
    pub rand_seed: i64,
    #[serde(default)]
    pub strategy: Strategy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    #[serde(default)]
    pub percentage: i32,
    /// When set, enrollment is decided by this endpoint instead of the percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_logic_api: Option<String>,
}

impl Flag {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_percentage(mut self, percentage: i32) -> Self {
        self.rollout.strategy.percentage = percentage;
        self
    }

    #[must_use]
    pub fn with_decision_logic_api(mut self, url: impl Into<String>) -> Self {
        self.rollout.strategy.decision_logic_api = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_rand_seed(mut self, seed: i64) -> Self {
        self.rollout.rand_seed = seed;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pilot {
    #[serde(default)]
    pub id: String,
    pub flag_id: String,
    pub external_id: String,
    pub enrolled: bool,
}

/// A per-flag IP allow-list entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allow {
    #[serde(default)]
    pub id: String,
    pub flag_id: String,
    pub ip_addr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    #[serde(default)]
    pub id: String,
    pub owner_uid: String,
    #[serde(skip)]
    pub sha512_hex: String,
    pub issued_at: DateTime<Utc>,
    pub duration_secs: i64,
}

impl Token {
    /// Hex encoded SHA-512 of a raw token, the form tokens are looked up by.
    #[must_use]
    pub fn digest(raw: &str) -> String {
        hex::encode(Sha512::digest(raw.as_bytes()))
    }
}
