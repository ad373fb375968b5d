mod entity;
mod models;

pub use entity::{Entity, EntityKind, typed};
pub use models::{Allow, Flag, Pilot, Rollout, Strategy, Token};
