use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::decision::{DEFAULT_DECISION_TIMEOUT, DecisionClient};
use super::percentile::is_enrolled_by_percentage;
use crate::config::DecisionConfig;
use crate::error::Result;
use crate::store::Store;
use crate::types::{Flag, Pilot};

/// Read-only enrollment decisions.
#[derive(Clone)]
pub struct FlagChecker {
    store: Arc<dyn Store>,
    decision: DecisionClient,
}

impl FlagChecker {
    pub fn new(store: Arc<dyn Store>) -> Result<Self> {
        Ok(Self::with_decision_client(
            store,
            DecisionClient::new(DEFAULT_DECISION_TIMEOUT)?,
        ))
    }

    /// Builds a checker whose delegate calls are bounded by `[decision] timeout_secs`.
    pub fn with_config(store: Arc<dyn Store>, config: &DecisionConfig) -> Result<Self> {
        Ok(Self::with_decision_client(
            store,
            DecisionClient::new(config.timeout())?,
        ))
    }

    pub fn with_decision_client(store: Arc<dyn Store>, decision: DecisionClient) -> Self {
        Self { store, decision }
    }

    /// True only for an existing flag rolled out to 100%. Unknown names are
    /// simply not enabled.
    pub fn is_feature_globally_enabled(&self, name: &str) -> Result<bool> {
        Ok(self
            .store
            .find_release_flag_by_name(name)?
            .is_some_and(|flag| flag.rollout.strategy.percentage == 100))
    }

    /// Evaluates a single flag for one pilot. Unknown flags are not enabled.
    pub async fn is_feature_enabled_for(&self, name: &str, pilot_external_id: &str) -> Result<bool> {
        let states = self.get_pilot_flag_states(pilot_external_id, &[name]).await?;
        Ok(states.get(name).copied().unwrap_or(false))
    }

    /// Returns one entry per distinct requested name. Duplicate names collapse
    /// into a single entry, so the map may be shorter than `flag_names`.
    ///
    /// Names without a flag stay `false`. A pilot row always wins over the
    /// flag's strategy, and only pilot rows of requested flags are applied.
    /// Flags the store returns under a name that was not asked for are
    /// ignored.
    pub async fn get_pilot_flag_states<S: AsRef<str>>(
        &self,
        pilot_external_id: &str,
        flag_names: &[S],
    ) -> Result<HashMap<String, bool>> {
        let names: Vec<String> = flag_names.iter().map(|n| n.as_ref().to_string()).collect();
        let mut states: HashMap<String, bool> =
            names.iter().map(|name| (name.clone(), false)).collect();
        if names.is_empty() {
            return Ok(states);
        }

        let flags: Vec<Flag> = self
            .store
            .find_release_flags_by_names(&names)?
            .into_iter()
            .filter(|flag| states.contains_key(&flag.name))
            .collect();
        let pilots = self.store.find_pilot_entries_by_ext_id(pilot_external_id)?;
        let pilot_index: HashMap<&str, &Pilot> =
            pilots.iter().map(|p| (p.flag_id.as_str(), p)).collect();

        for flag in &flags {
            let enrolled = self
                .check_enrollment(flag, pilot_external_id, &pilot_index)
                .await?;
            states.insert(flag.name.clone(), enrolled);
        }

        let requested: HashMap<&str, &str> = flags
            .iter()
            .map(|f| (f.id.as_str(), f.name.as_str()))
            .collect();
        for pilot in &pilots {
            if let Some(name) = requested.get(pilot.flag_id.as_str()) {
                states.insert((*name).to_string(), pilot.enrolled);
            }
        }

        Ok(states)
    }

    async fn check_enrollment(
        &self,
        flag: &Flag,
        pilot_external_id: &str,
        pilot_index: &HashMap<&str, &Pilot>,
    ) -> Result<bool> {
        if let Some(pilot) = pilot_index.get(flag.id.as_str()) {
            debug!(flag = %flag.name, pilot = pilot_external_id, enrolled = pilot.enrolled, "manual override");
            return Ok(pilot.enrolled);
        }

        if let Some(url) = &flag.rollout.strategy.decision_logic_api {
            return self
                .decision
                .is_enrolled(url, &flag.name, pilot_external_id)
                .await
                .inspect_err(|e| {
                    warn!(flag = %flag.name, pilot = pilot_external_id, "decision logic api failed: {e}")
                });
        }

        Ok(is_enrolled_by_percentage(
            pilot_external_id,
            flag.rollout.rand_seed,
            flag.rollout.strategy.percentage,
        ))
    }
}
