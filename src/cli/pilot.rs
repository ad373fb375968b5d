use super::{init_manager, resolve_flag};

pub fn run_pilot_set(
    data_dir: String,
    flag: String,
    pilot: String,
    enrolled: bool,
) -> anyhow::Result<()> {
    let manager = init_manager(&data_dir)?;
    let flag = resolve_flag(&manager, &flag)?;

    manager.set_pilot_enrollment_for_feature(&flag.id, &pilot, enrolled)?;

    let state = if enrolled { "enrolled in" } else { "excluded from" };
    println!("Pilot '{pilot}' {state} '{}'", flag.name);
    Ok(())
}

pub fn run_pilot_unset(data_dir: String, flag: String, pilot: String) -> anyhow::Result<()> {
    let manager = init_manager(&data_dir)?;
    let flag = resolve_flag(&manager, &flag)?;

    manager.unset_pilot_enrollment_for_feature(&flag.id, &pilot)?;

    println!("Removed override for pilot '{pilot}' on '{}'", flag.name);
    Ok(())
}

pub fn run_pilot_list(data_dir: String, flag: String, json: bool) -> anyhow::Result<()> {
    let manager = init_manager(&data_dir)?;
    let flag = resolve_flag(&manager, &flag)?;
    let pilots = manager.list_pilots_for_feature(&flag.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&pilots)?);
        return Ok(());
    }

    if pilots.is_empty() {
        println!("No pilot overrides for '{}'", flag.name);
        return Ok(());
    }

    for pilot in &pilots {
        println!("{:<32} {}", pilot.external_id, pilot.enrolled);
    }
    Ok(())
}
