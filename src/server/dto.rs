use serde::{Deserialize, Serialize};

use crate::types::Flag;

#[derive(Debug, Deserialize)]
pub struct CreateFlagRequest {
    pub name: String,
    #[serde(default)]
    pub percentage: i32,
    #[serde(default)]
    pub decision_logic_api: Option<String>,
    #[serde(default)]
    pub rand_seed: i64,
}

impl From<CreateFlagRequest> for Flag {
    fn from(req: CreateFlagRequest) -> Self {
        let mut flag = Flag::new(req.name)
            .with_percentage(req.percentage)
            .with_rand_seed(req.rand_seed);
        flag.rollout.strategy.decision_logic_api = req.decision_logic_api.filter(|u| !u.is_empty());
        flag
    }
}

/// Fields left out keep their stored value. An empty `decision_logic_api`
/// switches the flag back to the percentage strategy.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateFlagRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub percentage: Option<i32>,
    #[serde(default)]
    pub decision_logic_api: Option<String>,
    #[serde(default)]
    pub rand_seed: Option<i64>,
}

impl UpdateFlagRequest {
    pub fn apply(self, flag: &mut Flag) {
        if let Some(name) = self.name {
            flag.name = name;
        }
        if let Some(percentage) = self.percentage {
            flag.rollout.strategy.percentage = percentage;
        }
        if let Some(url) = self.decision_logic_api {
            flag.rollout.strategy.decision_logic_api = Some(url).filter(|u| !u.is_empty());
        }
        if let Some(seed) = self.rand_seed {
            flag.rollout.rand_seed = seed;
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetEnrollmentRequest {
    pub enrolled: bool,
}

#[derive(Debug, Deserialize)]
pub struct AllowIpRequest {
    pub ip_addr: String,
}

#[derive(Debug, Deserialize)]
pub struct PilotStatesRequest {
    pub pilot_id: String,
    #[serde(default)]
    pub release_flags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GlobalStateResponse {
    pub name: String,
    pub enabled: bool,
}
