use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Allow, Flag, Pilot, Token};
use crate::error::Error;

/// The kinds of rows a store keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Flag,
    Pilot,
    Allow,
    Token,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [Self::Flag, Self::Pilot, Self::Allow, Self::Token];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Flag => "Flag",
            Self::Pilot => "Pilot",
            Self::Allow => "Allow",
            Self::Token => "Token",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A stored row of any kind, used by the generic store operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Entity {
    Flag(Flag),
    Pilot(Pilot),
    Allow(Allow),
    Token(Token),
}

impl Entity {
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Flag(_) => EntityKind::Flag,
            Self::Pilot(_) => EntityKind::Pilot,
            Self::Allow(_) => EntityKind::Allow,
            Self::Token(_) => EntityKind::Token,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Flag(v) => &v.id,
            Self::Pilot(v) => &v.id,
            Self::Allow(v) => &v.id,
            Self::Token(v) => &v.id,
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        match self {
            Self::Flag(v) => v.id = id,
            Self::Pilot(v) => v.id = id,
            Self::Allow(v) => v.id = id,
            Self::Token(v) => v.id = id,
        }
    }
}

macro_rules! entity_conversions {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Entity {
                fn from(value: $variant) -> Self {
                    Entity::$variant(value)
                }
            }

            impl TryFrom<Entity> for $variant {
                type Error = Error;

                fn try_from(entity: Entity) -> Result<Self, Self::Error> {
                    match entity {
                        Entity::$variant(value) => Ok(value),
                        other => Err(Error::EntityKindMismatch {
                            expected: EntityKind::$variant,
                            found: other.kind(),
                        }),
                    }
                }
            }
        )*
    };
}

entity_conversions!(Flag, Pilot, Allow, Token);

/// Converts a list of generic rows into typed values, failing on the first foreign kind.
pub fn typed<T>(entities: Vec<Entity>) -> Result<Vec<T>, Error>
where
    T: TryFrom<Entity, Error = Error>,
{
    entities.into_iter().map(T::try_from).collect()
}
