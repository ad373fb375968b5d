use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::validation::{validate_flag, validate_ip_addr, validate_percentage};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::*;

/// Produces the seed for flags created without one.
pub type SeedGenerator = Arc<dyn Fn() -> i64 + Send + Sync>;

fn wall_clock_seed() -> i64 {
    Utc::now().timestamp_micros()
}

/// Administrative operations over flags, pilots and allow-list entries.
///
/// Name uniqueness and flag deletion are multi-step sequences against the
/// store. The SQLite and in-memory stores reject duplicate names themselves;
/// a crash half way through a deletion leaves child rows that a retried
/// deletion removes.
#[derive(Clone)]
pub struct RolloutManager {
    store: Arc<dyn Store>,
    seed: SeedGenerator,
}

impl RolloutManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            seed: Arc::new(wall_clock_seed),
        }
    }

    #[must_use]
    pub fn with_seed_generator(mut self, seed: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.seed = Arc::new(seed);
        self
    }

    pub fn create_feature_flag(&self, mut flag: Flag) -> Result<Flag> {
        if !flag.id.is_empty() {
            return Err(Error::InvalidAction);
        }
        validate_flag(&flag)?;

        if self.store.find_release_flag_by_name(&flag.name)?.is_some() {
            return Err(Error::AlreadyExists);
        }

        if flag.rollout.rand_seed == 0 {
            flag.rollout.rand_seed = (self.seed)();
        }

        let flag = Flag::try_from(self.store.create(flag.into())?)?;
        info!(flag = %flag.name, id = %flag.id, "created release flag");
        Ok(flag)
    }

    /// Updates a flag, resolving it by name when no id is given.
    /// A zero seed keeps the stored one.
    pub fn update_feature_flag(&self, mut flag: Flag) -> Result<Flag> {
        let existing = if flag.id.is_empty() {
            self.store
                .find_release_flag_by_name(&flag.name)?
                .ok_or(Error::NotFound)?
        } else {
            self.get_feature_flag(&flag.id)?
        };

        flag.id = existing.id;
        if flag.rollout.rand_seed == 0 {
            flag.rollout.rand_seed = existing.rollout.rand_seed;
        }
        validate_flag(&flag)?;

        if let Some(other) = self.store.find_release_flag_by_name(&flag.name)? {
            if other.id != flag.id {
                return Err(Error::AlreadyExists);
            }
        }

        self.store.update(&flag.clone().into())?;
        info!(flag = %flag.name, id = %flag.id, "updated release flag");
        Ok(flag)
    }

    pub fn update_feature_flag_rollout_percentage(&self, name: &str, percentage: i32) -> Result<Flag> {
        validate_percentage(percentage)?;
        let mut flag = self
            .store
            .find_release_flag_by_name(name)?
            .ok_or(Error::NotFound)?;
        flag.rollout.strategy.percentage = percentage;
        self.update_feature_flag(flag)
    }

    /// Lists every flag, sorted by name. Never fails just because there are none.
    pub fn list_feature_flags(&self) -> Result<Vec<Flag>> {
        let mut flags: Vec<Flag> = typed(self.store.find_all(EntityKind::Flag)?)?;
        flags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(flags)
    }

    pub fn get_feature_flag(&self, id: &str) -> Result<Flag> {
        if id.is_empty() {
            return Err(Error::IdRequired);
        }
        let entity = self
            .store
            .find_by_id(EntityKind::Flag, id)?
            .ok_or(Error::NotFound)?;
        Flag::try_from(entity)
    }

    pub fn find_feature_flag_by_name(&self, name: &str) -> Result<Option<Flag>> {
        self.store.find_release_flag_by_name(name)
    }

    /// Records a manual enrollment decision, updating the existing pilot row if any.
    pub fn set_pilot_enrollment_for_feature(
        &self,
        flag_id: &str,
        external_id: &str,
        enrolled: bool,
    ) -> Result<Pilot> {
        let flag = self.get_feature_flag(flag_id)?;

        if let Some(mut pilot) = self
            .store
            .find_release_flag_pilot_by_pilot_external_id(&flag.id, external_id)?
        {
            if pilot.enrolled != enrolled {
                pilot.enrolled = enrolled;
                self.store.update(&pilot.clone().into())?;
            }
            info!(flag = %flag.name, pilot = external_id, enrolled, "updated pilot enrollment");
            return Ok(pilot);
        }

        let pilot = Pilot {
            id: String::new(),
            flag_id: flag.id.clone(),
            external_id: external_id.to_string(),
            enrolled,
        };
        let pilot = Pilot::try_from(self.store.create(pilot.into())?)?;
        info!(flag = %flag.name, pilot = external_id, enrolled, "created pilot enrollment");
        Ok(pilot)
    }

    /// Removes a manual enrollment decision. Missing rows are not an error.
    pub fn unset_pilot_enrollment_for_feature(&self, flag_id: &str, external_id: &str) -> Result<()> {
        let flag = self.get_feature_flag(flag_id)?;

        let Some(pilot) = self
            .store
            .find_release_flag_pilot_by_pilot_external_id(&flag.id, external_id)?
        else {
            return Ok(());
        };

        ignore_not_found(self.store.delete_by_id(EntityKind::Pilot, &pilot.id))?;
        info!(flag = %flag.name, pilot = external_id, "removed pilot enrollment");
        Ok(())
    }

    pub fn list_pilots_for_feature(&self, flag_id: &str) -> Result<Vec<Pilot>> {
        let flag = self.get_feature_flag(flag_id)?;
        self.store.find_pilots_by_feature_flag(&flag.id)
    }

    pub fn allow_ip_addr_for_flag(&self, flag_id: &str, ip_addr: &str) -> Result<Allow> {
        validate_ip_addr(ip_addr)?;
        let flag = self.get_feature_flag(flag_id)?;

        let allow = Allow {
            id: String::new(),
            flag_id: flag.id.clone(),
            ip_addr: ip_addr.to_string(),
        };
        let allow = Allow::try_from(self.store.create(allow.into())?)?;
        info!(flag = %flag.name, ip_addr, "allowed ip address");
        Ok(allow)
    }

    pub fn list_allows_for_flag(&self, flag_id: &str) -> Result<Vec<Allow>> {
        let flag = self.get_feature_flag(flag_id)?;
        self.store.find_release_allows_by_release_flags(&[flag])
    }

    /// Deletes a flag together with its pilots and allow-list entries.
    ///
    /// Children go first, so an interrupted deletion can simply be retried.
    pub fn delete_feature_flag(&self, id: &str) -> Result<()> {
        let flag = self.get_feature_flag(id)?;

        for pilot in self.store.find_pilots_by_feature_flag(&flag.id)? {
            ignore_not_found(self.store.delete_by_id(EntityKind::Pilot, &pilot.id))?;
        }
        for allow in self
            .store
            .find_release_allows_by_release_flags(std::slice::from_ref(&flag))?
        {
            ignore_not_found(self.store.delete_by_id(EntityKind::Allow, &allow.id))?;
        }

        self.store.delete_by_id(EntityKind::Flag, &flag.id)?;
        info!(flag = %flag.name, id = %flag.id, "deleted release flag");
        Ok(())
    }
}

fn ignore_not_found(result: Result<()>) -> Result<()> {
    match result {
        Err(Error::NotFound) => {
            warn!("row already deleted");
            Ok(())
        }
        other => other,
    }
}
