use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, ffi, params, params_from_iter};
use uuid::Uuid;

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const FLAG_COLUMNS: &str = "id, name, rand_seed, percentage, decision_logic_api";
const PILOT_COLUMNS: &str = "id, flag_id, external_id, enrolled";
const ALLOW_COLUMNS: &str = "id, flag_id, ip_addr";
const TOKEN_COLUMNS: &str = "id, owner_uid, sha512_hex, issued_at, duration_secs";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    /// Opens a private in-memory database, mostly useful for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn select_flags(&self, clause: &str, args: &[&str]) -> Result<Vec<Flag>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {FLAG_COLUMNS} FROM release_flags {clause} ORDER BY rowid"
        ))?;
        let rows = stmt.query_map(params_from_iter(args), flag_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn select_pilots(&self, clause: &str, args: &[&str]) -> Result<Vec<Pilot>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PILOT_COLUMNS} FROM release_pilots {clause} ORDER BY rowid"
        ))?;
        let rows = stmt.query_map(params_from_iter(args), pilot_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn select_allows(&self, clause: &str, args: &[&str]) -> Result<Vec<Allow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ALLOW_COLUMNS} FROM release_allows {clause} ORDER BY rowid"
        ))?;
        let rows = stmt.query_map(params_from_iter(args), allow_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn select_tokens(&self, clause: &str, args: &[&str]) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens {clause} ORDER BY rowid"
        ))?;
        let rows = stmt.query_map(params_from_iter(args), token_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Flag => "release_flags",
        EntityKind::Pilot => "release_pilots",
        EntityKind::Allow => "release_allows",
        EntityKind::Token => "tokens",
    }
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn map_write_error(err: rusqlite::Error) -> Error {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            match e.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    Error::AlreadyExists
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Error::NotFound,
                ffi::SQLITE_CONSTRAINT_CHECK => {
                    Error::Validation("percentage must be between 0 and 100".to_string())
                }
                _ => Error::from(err),
            }
        }
        _ => Error::from(err),
    }
}

fn flag_from_row(row: &Row<'_>) -> rusqlite::Result<Flag> {
    Ok(Flag {
        id: row.get(0)?,
        name: row.get(1)?,
        rollout: Rollout {
            rand_seed: row.get(2)?,
            strategy: Strategy {
                percentage: row.get(3)?,
                decision_logic_api: row.get(4)?,
            },
        },
    })
}

fn pilot_from_row(row: &Row<'_>) -> rusqlite::Result<Pilot> {
    Ok(Pilot {
        id: row.get(0)?,
        flag_id: row.get(1)?,
        external_id: row.get(2)?,
        enrolled: row.get(3)?,
    })
}

fn allow_from_row(row: &Row<'_>) -> rusqlite::Result<Allow> {
    Ok(Allow {
        id: row.get(0)?,
        flag_id: row.get(1)?,
        ip_addr: row.get(2)?,
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        owner_uid: row.get(1)?,
        sha512_hex: row.get(2)?,
        issued_at: parse_datetime(&row.get::<_, String>(3)?),
        duration_secs: row.get(4)?,
    })
}

impl Store for SqliteStore {
    fn create(&self, mut entity: Entity) -> Result<Entity> {
        if !entity.id().is_empty() {
            return Err(Error::InvalidAction);
        }
        entity.set_id(Uuid::new_v4().to_string());

        let conn = self.conn();
        let result = match &entity {
            Entity::Flag(flag) => conn.execute(
                &format!("INSERT INTO release_flags ({FLAG_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
                params![
                    flag.id,
                    flag.name,
                    flag.rollout.rand_seed,
                    flag.rollout.strategy.percentage,
                    flag.rollout.strategy.decision_logic_api,
                ],
            ),
            Entity::Pilot(pilot) => conn.execute(
                &format!("INSERT INTO release_pilots ({PILOT_COLUMNS}) VALUES (?1, ?2, ?3, ?4)"),
                params![pilot.id, pilot.flag_id, pilot.external_id, pilot.enrolled],
            ),
            Entity::Allow(allow) => conn.execute(
                &format!("INSERT INTO release_allows ({ALLOW_COLUMNS}) VALUES (?1, ?2, ?3)"),
                params![allow.id, allow.flag_id, allow.ip_addr],
            ),
            Entity::Token(token) => conn.execute(
                &format!("INSERT INTO tokens ({TOKEN_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
                params![
                    token.id,
                    token.owner_uid,
                    token.sha512_hex,
                    format_datetime(&token.issued_at),
                    token.duration_secs,
                ],
            ),
        };

        result.map_err(map_write_error)?;
        Ok(entity)
    }

    fn find_by_id(&self, kind: EntityKind, id: &str) -> Result<Option<Entity>> {
        let found = match kind {
            EntityKind::Flag => self
                .select_flags("WHERE id = ?1", &[id])?
                .into_iter()
                .next()
                .map(Entity::from),
            EntityKind::Pilot => self
                .select_pilots("WHERE id = ?1", &[id])?
                .into_iter()
                .next()
                .map(Entity::from),
            EntityKind::Allow => self
                .select_allows("WHERE id = ?1", &[id])?
                .into_iter()
                .next()
                .map(Entity::from),
            EntityKind::Token => self
                .select_tokens("WHERE id = ?1", &[id])?
                .into_iter()
                .next()
                .map(Entity::from),
        };
        Ok(found)
    }

    fn find_all(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        let all = match kind {
            EntityKind::Flag => self.select_flags("", &[])?.into_iter().map(Entity::from).collect(),
            EntityKind::Pilot => self.select_pilots("", &[])?.into_iter().map(Entity::from).collect(),
            EntityKind::Allow => self.select_allows("", &[])?.into_iter().map(Entity::from).collect(),
            EntityKind::Token => self.select_tokens("", &[])?.into_iter().map(Entity::from).collect(),
        };
        Ok(all)
    }

    fn update(&self, entity: &Entity) -> Result<()> {
        let conn = self.conn();
        let result = match entity {
            Entity::Flag(flag) => conn.execute(
                "UPDATE release_flags SET name = ?1, rand_seed = ?2, percentage = ?3, decision_logic_api = ?4
                 WHERE id = ?5",
                params![
                    flag.name,
                    flag.rollout.rand_seed,
                    flag.rollout.strategy.percentage,
                    flag.rollout.strategy.decision_logic_api,
                    flag.id,
                ],
            ),
            Entity::Pilot(pilot) => conn.execute(
                "UPDATE release_pilots SET flag_id = ?1, external_id = ?2, enrolled = ?3 WHERE id = ?4",
                params![pilot.flag_id, pilot.external_id, pilot.enrolled, pilot.id],
            ),
            Entity::Allow(allow) => conn.execute(
                "UPDATE release_allows SET flag_id = ?1, ip_addr = ?2 WHERE id = ?3",
                params![allow.flag_id, allow.ip_addr, allow.id],
            ),
            Entity::Token(token) => conn.execute(
                "UPDATE tokens SET owner_uid = ?1, sha512_hex = ?2, issued_at = ?3, duration_secs = ?4
                 WHERE id = ?5",
                params![
                    token.owner_uid,
                    token.sha512_hex,
                    format_datetime(&token.issued_at),
                    token.duration_secs,
                    token.id,
                ],
            ),
        };

        let rows = result.map_err(map_write_error)?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_by_id(&self, kind: EntityKind, id: &str) -> Result<()> {
        let rows = self.conn().execute(
            &format!("DELETE FROM {} WHERE id = ?1", table(kind)),
            params![id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_all(&self, kind: EntityKind) -> Result<()> {
        self.conn()
            .execute(&format!("DELETE FROM {}", table(kind)), [])?;
        Ok(())
    }

    fn truncate(&self, kind: EntityKind) -> Result<()> {
        // SQLite has no TRUNCATE; an unqualified DELETE takes the truncate fast path.
        self.delete_all(kind)
    }

    fn find_release_flag_by_name(&self, name: &str) -> Result<Option<Flag>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {FLAG_COLUMNS} FROM release_flags WHERE name = ?1"),
            params![name],
            flag_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn find_release_flags_by_names(&self, names: &[String]) -> Result<Vec<Flag>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let args: Vec<&str> = names.iter().map(String::as_str).collect();
        self.select_flags(
            &format!("WHERE name IN ({})", placeholders(args.len())),
            &args,
        )
    }

    fn find_release_flag_pilot_by_pilot_external_id(
        &self,
        flag_id: &str,
        external_id: &str,
    ) -> Result<Option<Pilot>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {PILOT_COLUMNS} FROM release_pilots WHERE flag_id = ?1 AND external_id = ?2"
            ),
            params![flag_id, external_id],
            pilot_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn find_pilots_by_feature_flag(&self, flag_id: &str) -> Result<Vec<Pilot>> {
        self.select_pilots("WHERE flag_id = ?1", &[flag_id])
    }

    fn find_pilot_entries_by_ext_id(&self, external_id: &str) -> Result<Vec<Pilot>> {
        self.select_pilots("WHERE external_id = ?1", &[external_id])
    }

    fn find_release_allows_by_release_flags(&self, flags: &[Flag]) -> Result<Vec<Allow>> {
        if flags.is_empty() {
            return Ok(Vec::new());
        }
        let args: Vec<&str> = flags.iter().map(|f| f.id.as_str()).collect();
        self.select_allows(
            &format!("WHERE flag_id IN ({})", placeholders(args.len())),
            &args,
        )
    }

    fn find_token_by_sha512_hex(&self, sha512_hex: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE sha512_hex = ?1"),
            params![sha512_hex],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
