use std::net::IpAddr;

use crate::error::{Error, Result};
use crate::types::Flag;

const MAX_FLAG_NAME_LEN: usize = 128;

pub fn validate_flag(flag: &Flag) -> Result<()> {
    validate_flag_name(&flag.name)?;
    validate_percentage(flag.rollout.strategy.percentage)?;
    if let Some(url) = &flag.rollout.strategy.decision_logic_api {
        validate_decision_logic_api(url)?;
    }
    Ok(())
}

pub fn validate_flag_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation("flag name cannot be empty".to_string()));
    }
    if name.len() > MAX_FLAG_NAME_LEN {
        return Err(Error::Validation(format!(
            "flag name cannot exceed {MAX_FLAG_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_percentage(percentage: i32) -> Result<()> {
    if !(0..=100).contains(&percentage) {
        return Err(Error::Validation(format!(
            "percentage must be between 0 and 100, got {percentage}"
        )));
    }
    Ok(())
}

fn validate_decision_logic_api(url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| Error::Validation(format!("invalid decision logic api url: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Validation(
            "decision logic api url must use http or https".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_ip_addr(ip_addr: &str) -> Result<()> {
    ip_addr
        .parse::<IpAddr>()
        .map(|_| ())
        .map_err(|_| Error::Validation(format!("invalid ip address: {ip_addr}")))
}
