use serde::Serialize;

use super::{init_manager, resolve_flag};
use crate::types::Flag;

#[derive(Serialize)]
struct FlagOutput {
    id: String,
    name: String,
    percentage: i32,
    rand_seed: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    decision_logic_api: Option<String>,
}

impl From<Flag> for FlagOutput {
    fn from(flag: Flag) -> Self {
        Self {
            id: flag.id,
            name: flag.name,
            percentage: flag.rollout.strategy.percentage,
            rand_seed: flag.rollout.rand_seed,
            decision_logic_api: flag.rollout.strategy.decision_logic_api,
        }
    }
}

pub fn run_flag_create(
    data_dir: String,
    name: String,
    percentage: i32,
    decision_logic_api: Option<String>,
    rand_seed: Option<i64>,
) -> anyhow::Result<()> {
    let manager = init_manager(&data_dir)?;

    let mut flag = Flag::new(name)
        .with_percentage(percentage)
        .with_rand_seed(rand_seed.unwrap_or(0));
    flag.rollout.strategy.decision_logic_api = decision_logic_api.filter(|u| !u.is_empty());

    let flag = manager.create_feature_flag(flag)?;

    println!("Created flag '{}' ({})", flag.name, flag.id);
    Ok(())
}

pub fn run_flag_list(data_dir: String, json: bool) -> anyhow::Result<()> {
    let manager = init_manager(&data_dir)?;
    let flags: Vec<FlagOutput> = manager
        .list_feature_flags()?
        .into_iter()
        .map(FlagOutput::from)
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&flags)?);
        return Ok(());
    }

    if flags.is_empty() {
        println!("No flags");
        return Ok(());
    }

    for flag in &flags {
        match &flag.decision_logic_api {
            Some(url) => println!("{:<32} delegated to {url}", flag.name),
            None => println!("{:<32} {:>3}%", flag.name, flag.percentage),
        }
    }
    Ok(())
}

pub fn run_flag_update(
    data_dir: String,
    name: String,
    percentage: Option<i32>,
    decision_logic_api: Option<String>,
    rand_seed: Option<i64>,
) -> anyhow::Result<()> {
    let manager = init_manager(&data_dir)?;
    let mut flag = resolve_flag(&manager, &name)?;

    if let Some(percentage) = percentage {
        flag.rollout.strategy.percentage = percentage;
    }
    if let Some(url) = decision_logic_api {
        flag.rollout.strategy.decision_logic_api = Some(url).filter(|u| !u.is_empty());
    }
    if let Some(seed) = rand_seed {
        flag.rollout.rand_seed = seed;
    }

    let flag = manager.update_feature_flag(flag)?;

    println!(
        "Updated flag '{}' ({}%)",
        flag.name, flag.rollout.strategy.percentage
    );
    Ok(())
}

pub fn run_flag_delete(data_dir: String, name: String) -> anyhow::Result<()> {
    let manager = init_manager(&data_dir)?;
    let flag = resolve_flag(&manager, &name)?;

    manager.delete_feature_flag(&flag.id)?;

    println!("Deleted flag '{}'", flag.name);
    Ok(())
}
