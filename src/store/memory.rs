use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use super::Store;
use crate::error::{Error, Result};
use crate::types::*;

/// In-memory storage backed by a `RwLock` over per-kind tables.
///
/// Mirrors the SQLite constraints: unique flag names, one pilot per flag and
/// external id, child rows must reference an existing flag and are removed
/// with it.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<EntityKind, Vec<Entity>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<EntityKind, Vec<Entity>>> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<EntityKind, Vec<Entity>>> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    fn rows<T>(&self, kind: EntityKind) -> Vec<T>
    where
        T: TryFrom<Entity, Error = Error>,
    {
        self.read()
            .get(&kind)
            .into_iter()
            .flatten()
            .cloned()
            .filter_map(|entity| T::try_from(entity).ok())
            .collect()
    }
}

fn flags(tables: &HashMap<EntityKind, Vec<Entity>>) -> impl Iterator<Item = &Flag> {
    tables.get(&EntityKind::Flag).into_iter().flatten().filter_map(|e| match e {
        Entity::Flag(flag) => Some(flag),
        _ => None,
    })
}

fn pilots(tables: &HashMap<EntityKind, Vec<Entity>>) -> impl Iterator<Item = &Pilot> {
    tables.get(&EntityKind::Pilot).into_iter().flatten().filter_map(|e| match e {
        Entity::Pilot(pilot) => Some(pilot),
        _ => None,
    })
}

/// Checks uniqueness and references of `entity` against the current tables.
fn check_constraints(tables: &HashMap<EntityKind, Vec<Entity>>, entity: &Entity) -> Result<()> {
    let flag_exists = |flag_id: &str| flags(tables).any(|f| f.id == flag_id);

    match entity {
        Entity::Flag(flag) => {
            if flags(tables).any(|f| f.name == flag.name && f.id != flag.id) {
                return Err(Error::AlreadyExists);
            }
        }
        Entity::Pilot(pilot) => {
            if !flag_exists(&pilot.flag_id) {
                return Err(Error::NotFound);
            }
            if pilots(tables).any(|p| {
                p.flag_id == pilot.flag_id && p.external_id == pilot.external_id && p.id != pilot.id
            }) {
                return Err(Error::AlreadyExists);
            }
        }
        Entity::Allow(allow) => {
            if !flag_exists(&allow.flag_id) {
                return Err(Error::NotFound);
            }
        }
        Entity::Token(_) => {}
    }
    Ok(())
}

fn remove_children(tables: &mut HashMap<EntityKind, Vec<Entity>>, flag_ids: &[String]) {
    for kind in [EntityKind::Pilot, EntityKind::Allow] {
        if let Some(rows) = tables.get_mut(&kind) {
            rows.retain(|e| match e {
                Entity::Pilot(p) => !flag_ids.contains(&p.flag_id),
                Entity::Allow(a) => !flag_ids.contains(&a.flag_id),
                _ => true,
            });
        }
    }
}

impl Store for MemoryStore {
    fn create(&self, mut entity: Entity) -> Result<Entity> {
        if !entity.id().is_empty() {
            return Err(Error::InvalidAction);
        }
        entity.set_id(Uuid::new_v4().to_string());

        let mut tables = self.write();
        check_constraints(&tables, &entity)?;
        tables.entry(entity.kind()).or_default().push(entity.clone());
        Ok(entity)
    }

    fn find_by_id(&self, kind: EntityKind, id: &str) -> Result<Option<Entity>> {
        Ok(self
            .read()
            .get(&kind)
            .and_then(|rows| rows.iter().find(|e| e.id() == id))
            .cloned())
    }

    fn find_all(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        Ok(self.read().get(&kind).cloned().unwrap_or_default())
    }

    fn update(&self, entity: &Entity) -> Result<()> {
        let mut tables = self.write();
        check_constraints(&tables, entity)?;
        let row = tables
            .get_mut(&entity.kind())
            .and_then(|rows| rows.iter_mut().find(|e| e.id() == entity.id()))
            .ok_or(Error::NotFound)?;
        *row = entity.clone();
        Ok(())
    }

    fn delete_by_id(&self, kind: EntityKind, id: &str) -> Result<()> {
        let mut tables = self.write();
        let rows = tables.get_mut(&kind).ok_or(Error::NotFound)?;
        let before = rows.len();
        rows.retain(|e| e.id() != id);
        if rows.len() == before {
            return Err(Error::NotFound);
        }
        if kind == EntityKind::Flag {
            remove_children(&mut tables, &[id.to_string()]);
        }
        Ok(())
    }

    fn delete_all(&self, kind: EntityKind) -> Result<()> {
        let mut tables = self.write();
        let removed = tables.remove(&kind).unwrap_or_default();
        if kind == EntityKind::Flag {
            let ids: Vec<String> = removed.iter().map(|e| e.id().to_string()).collect();
            remove_children(&mut tables, &ids);
        }
        Ok(())
    }

    fn truncate(&self, kind: EntityKind) -> Result<()> {
        self.delete_all(kind)
    }

    fn find_release_flag_by_name(&self, name: &str) -> Result<Option<Flag>> {
        Ok(flags(&self.read()).find(|f| f.name == name).cloned())
    }

    fn find_release_flags_by_names(&self, names: &[String]) -> Result<Vec<Flag>> {
        Ok(flags(&self.read())
            .filter(|f| names.contains(&f.name))
            .cloned()
            .collect())
    }

    fn find_release_flag_pilot_by_pilot_external_id(
        &self,
        flag_id: &str,
        external_id: &str,
    ) -> Result<Option<Pilot>> {
        Ok(pilots(&self.read())
            .find(|p| p.flag_id == flag_id && p.external_id == external_id)
            .cloned())
    }

    fn find_pilots_by_feature_flag(&self, flag_id: &str) -> Result<Vec<Pilot>> {
        Ok(pilots(&self.read())
            .filter(|p| p.flag_id == flag_id)
            .cloned()
            .collect())
    }

    fn find_pilot_entries_by_ext_id(&self, external_id: &str) -> Result<Vec<Pilot>> {
        Ok(pilots(&self.read())
            .filter(|p| p.external_id == external_id)
            .cloned()
            .collect())
    }

    fn find_release_allows_by_release_flags(&self, flags: &[Flag]) -> Result<Vec<Allow>> {
        Ok(self
            .rows::<Allow>(EntityKind::Allow)
            .into_iter()
            .filter(|a| flags.iter().any(|f| f.id == a.flag_id))
            .collect())
    }

    fn find_token_by_sha512_hex(&self, sha512_hex: &str) -> Result<Option<Token>> {
        Ok(self
            .rows::<Token>(EntityKind::Token)
            .into_iter()
            .find(|t| t.sha512_hex == sha512_hex))
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
