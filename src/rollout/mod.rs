mod checker;
mod decision;
mod manager;
mod percentile;
mod validation;

pub use checker::FlagChecker;
pub use decision::{DEFAULT_DECISION_TIMEOUT, DecisionClient};
pub use manager::{RolloutManager, SeedGenerator};
pub use percentile::{fnv1a64, is_enrolled_by_percentage, percentile};
pub use validation::{validate_flag, validate_ip_addr, validate_percentage};
