use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::init_store;
use crate::config::Config;
use crate::rollout::FlagChecker;

/// Prints flag states. Without a pilot only the global state is checked.
pub async fn run_check(
    data_dir: String,
    config: Option<PathBuf>,
    pilot: Option<String>,
    flags: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    let config = match config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let checker = FlagChecker::with_config(Arc::new(init_store(&data_dir)?), &config.decision)?;

    let states: BTreeMap<String, bool> = match &pilot {
        Some(pilot) => checker
            .get_pilot_flag_states(pilot, &flags)
            .await?
            .into_iter()
            .collect(),
        None => flags
            .iter()
            .map(|name| Ok((name.clone(), checker.is_feature_globally_enabled(name)?)))
            .collect::<anyhow::Result<_>>()?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&states)?);
        return Ok(());
    }

    for (name, enabled) in &states {
        println!("{:<32} {}", name, if *enabled { "on" } else { "off" });
    }
    Ok(())
}
