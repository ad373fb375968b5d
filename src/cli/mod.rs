mod check;
mod commands;
mod flag;
mod pilot;

pub use check::run_check;
pub use commands::{FlagCommands, PilotCommands};
pub use flag::{run_flag_create, run_flag_delete, run_flag_list, run_flag_update};
pub use pilot::{run_pilot_list, run_pilot_set, run_pilot_unset};

use std::sync::Arc;

use crate::rollout::RolloutManager;
use crate::store::SqliteStore;
use crate::types::Flag;

/// Opens the database in a data directory, creating it on first use
pub fn init_store(data_dir: &str) -> anyhow::Result<SqliteStore> {
    let data_path: std::path::PathBuf = data_dir.into();
    std::fs::create_dir_all(&data_path)?;

    let store = SqliteStore::new(data_path.join("rollout.db"))?;
    store.initialize()?;
    Ok(store)
}

fn init_manager(data_dir: &str) -> anyhow::Result<RolloutManager> {
    Ok(RolloutManager::new(Arc::new(init_store(data_dir)?)))
}

fn resolve_flag(manager: &RolloutManager, name: &str) -> anyhow::Result<Flag> {
    manager
        .find_feature_flag_by_name(name)?
        .ok_or_else(|| anyhow::anyhow!("Flag '{name}' not found"))
}
