mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the durable storage contract.
///
/// Single-row lookups return `Ok(None)` when nothing matches; `update` and
/// `delete_by_id` report a missing row as [`crate::error::Error::NotFound`].
pub trait Store: Send + Sync {
    // Generic entity operations

    /// Persists a new entity and returns it with its assigned id.
    /// Entities that already carry an id are rejected.
    fn create(&self, entity: Entity) -> Result<Entity>;
    fn find_by_id(&self, kind: EntityKind, id: &str) -> Result<Option<Entity>>;
    fn find_all(&self, kind: EntityKind) -> Result<Vec<Entity>>;
    fn update(&self, entity: &Entity) -> Result<()>;
    fn delete_by_id(&self, kind: EntityKind, id: &str) -> Result<()>;
    fn delete_all(&self, kind: EntityKind) -> Result<()>;
    fn truncate(&self, kind: EntityKind) -> Result<()>;

    // Release flag lookups
    fn find_release_flag_by_name(&self, name: &str) -> Result<Option<Flag>>;
    fn find_release_flags_by_names(&self, names: &[String]) -> Result<Vec<Flag>>;

    // Pilot lookups
    fn find_release_flag_pilot_by_pilot_external_id(
        &self,
        flag_id: &str,
        external_id: &str,
    ) -> Result<Option<Pilot>>;
    fn find_pilots_by_feature_flag(&self, flag_id: &str) -> Result<Vec<Pilot>>;
    fn find_pilot_entries_by_ext_id(&self, external_id: &str) -> Result<Vec<Pilot>>;

    // Allow lookups
    fn find_release_allows_by_release_flags(&self, flags: &[Flag]) -> Result<Vec<Allow>>;

    // Token lookups
    fn find_token_by_sha512_hex(&self, sha512_hex: &str) -> Result<Option<Token>>;

    fn close(&self) -> Result<()>;
}
