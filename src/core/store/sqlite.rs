//! SQLite-backed document store
//!
//! Documents are stored as JSON text in a single `documents` table keyed by
//! (collection, id), next to a lowercase name key for case-insensitive
//! lookups. The name key is unique per collection, so two processes sharing
//! the database file cannot both insert the same name. Id sequences live in
//! their own table and are drawn inside an IMMEDIATE transaction. Mirror
//! intents are kept in `mirror_outbox` until their mutation completes.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{ffi, params, Connection, OptionalExtension, TransactionBehavior};

use super::{
    document_id, document_name, name_key, ArrayUpdate, Document, DocumentStore, FieldSet, Filter,
    OutboxEntry, StoreError, StoreResult,
};
use crate::core::identity::{EntityId, EntityKind};
use crate::core::links::MirrorIntent;

/// Current schema version - bumped when the table layout changes
const SCHEMA_VERSION: i32 = 2;

/// Default time to wait on a locked database before failing
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A document store persisted in a SQLite database file
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open_with_timeout(path: &Path, busy_timeout: Duration) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::from_connection(conn)
    }

    /// A private, non-persistent store
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite connection lock poisoned".to_string()))
    }
}

fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        -- One row per document, all collections share the table
        CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            id INTEGER NOT NULL,
            name_key TEXT NOT NULL,
            body TEXT NOT NULL,
            PRIMARY KEY (collection, id)
        );

        -- Last id handed out per collection
        CREATE TABLE IF NOT EXISTS sequences (
            collection TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        );

        -- Mirrored updates that have not finished yet
        CREATE TABLE IF NOT EXISTS mirror_outbox (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            intent TEXT NOT NULL
        );
        "#,
    )?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()?;
    match version {
        None => {
            create_name_index(conn)?;
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;
        }
        // Version 1 had a non-unique name index and no outbox
        Some(1) => {
            conn.execute_batch("DROP INDEX IF EXISTS idx_documents_name;")?;
            create_name_index(conn)?;
            conn.execute(
                "UPDATE schema_version SET version = ?1",
                params![SCHEMA_VERSION],
            )?;
        }
        Some(v) if v != SCHEMA_VERSION => {
            return Err(StoreError::Unavailable(format!(
                "database schema version {} is not supported (expected {})",
                v, SCHEMA_VERSION
            )));
        }
        Some(_) => {}
    }
    Ok(())
}

fn create_name_index(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_name_key ON documents(collection, name_key);",
    )?;
    Ok(())
}

/// Map unique-constraint failures on `documents` to store errors
fn write_conflict(
    err: rusqlite::Error,
    kind: EntityKind,
    id: EntityId,
    doc: &Document,
) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            StoreError::DuplicateKey { kind, id }
        }
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE => {
            StoreError::DuplicateName {
                kind,
                name: document_name(doc).unwrap_or_default().to_string(),
            }
        }
        err => err.into(),
    }
}

fn sql_id(id: EntityId) -> i64 {
    id.value() as i64
}

fn entity_id(value: i64) -> EntityId {
    EntityId::new(value as u64)
}

fn parse_body(body: &str) -> StoreResult<Document> {
    Ok(serde_json::from_str(body)?)
}

fn doc_name_key(kind: EntityKind, doc: &Document) -> StoreResult<String> {
    document_name(doc)
        .map(name_key)
        .ok_or_else(|| StoreError::Corrupt {
            kind,
            reason: "missing string 'name'".to_string(),
        })
}

impl DocumentStore for SqliteStore {
    fn find_by_id(&self, kind: EntityKind, id: EntityId) -> StoreResult<Option<Document>> {
        let conn = self.lock()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![kind.as_str(), sql_id(id)],
                |row| row.get(0),
            )
            .optional()?;
        body.as_deref().map(parse_body).transpose()
    }

    fn find_all(&self, kind: EntityKind) -> StoreResult<Vec<Document>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT body FROM documents WHERE collection = ?1 ORDER BY id")?;
        let bodies = stmt
            .query_map(params![kind.as_str()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        bodies.iter().map(|b| parse_body(b)).collect()
    }

    fn find_one_by_name(&self, kind: EntityKind, name: &str) -> StoreResult<Option<Document>> {
        let conn = self.lock()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND name_key = ?2 ORDER BY id LIMIT 1",
                params![kind.as_str(), name_key(name)],
                |row| row.get(0),
            )
            .optional()?;
        body.as_deref().map(parse_body).transpose()
    }

    fn find_max_id(&self, kind: EntityKind) -> StoreResult<Option<EntityId>> {
        let conn = self.lock()?;
        let max: Option<i64> = conn.query_row(
            "SELECT MAX(id) FROM documents WHERE collection = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(max.map(entity_id))
    }

    fn next_sequence(&self, kind: EntityKind) -> StoreResult<EntityId> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let stored_max: Option<i64> = tx.query_row(
            "SELECT MAX(id) FROM documents WHERE collection = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        let last_drawn: Option<i64> = tx
            .query_row(
                "SELECT value FROM sequences WHERE collection = ?1",
                params![kind.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let next = stored_max.unwrap_or(0).max(last_drawn.unwrap_or(0)) + 1;
        tx.execute(
            "INSERT INTO sequences (collection, value) VALUES (?1, ?2)
             ON CONFLICT(collection) DO UPDATE SET value = excluded.value",
            params![kind.as_str(), next],
        )?;
        tx.commit()?;

        Ok(entity_id(next))
    }

    fn insert_one(&self, kind: EntityKind, doc: Document) -> StoreResult<()> {
        let id = document_id(kind, &doc)?;
        let key = doc_name_key(kind, &doc)?;
        let body = serde_json::to_string(&doc)?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO documents (collection, id, name_key, body) VALUES (?1, ?2, ?3, ?4)",
            params![kind.as_str(), sql_id(id), key, body],
        )
        .map_err(|e| write_conflict(e, kind, id, &doc))?;
        Ok(())
    }

    fn set_fields(&self, kind: EntityKind, id: EntityId, fields: FieldSet) -> StoreResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let body: Option<String> = tx
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![kind.as_str(), sql_id(id)],
                |row| row.get(0),
            )
            .optional()?;
        let Some(body) = body else {
            return Ok(false);
        };

        let mut doc = parse_body(&body)?;
        doc.as_object_mut()
            .ok_or_else(|| StoreError::Corrupt {
                kind,
                reason: "document is not an object".to_string(),
            })?
            .extend(fields);

        tx.execute(
            "UPDATE documents SET name_key = ?1, body = ?2 WHERE collection = ?3 AND id = ?4",
            params![
                doc_name_key(kind, &doc)?,
                serde_json::to_string(&doc)?,
                kind.as_str(),
                sql_id(id)
            ],
        )
        .map_err(|e| write_conflict(e, kind, id, &doc))?;
        tx.commit()?;
        Ok(true)
    }

    fn delete_one(&self, kind: EntityKind, id: EntityId) -> StoreResult<bool> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![kind.as_str(), sql_id(id)],
        )?;
        Ok(removed > 0)
    }

    fn update_many(
        &self,
        kind: EntityKind,
        filter: &Filter,
        update: &ArrayUpdate,
    ) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let rows: Vec<(i64, String)> = {
            let mut stmt = tx.prepare("SELECT id, body FROM documents WHERE collection = ?1")?;
            let rows = stmt
                .query_map(params![kind.as_str()], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut changed = 0;
        for (raw_id, body) in rows {
            let id = entity_id(raw_id);
            let mut doc = parse_body(&body)?;
            if !filter.matches(id, &doc) || !update.apply(kind, &mut doc)? {
                continue;
            }
            tx.execute(
                "UPDATE documents SET body = ?1 WHERE collection = ?2 AND id = ?3",
                params![serde_json::to_string(&doc)?, kind.as_str(), raw_id],
            )?;
            changed += 1;
        }

        tx.commit()?;
        Ok(changed)
    }

    fn record_intent(&self, intent: &MirrorIntent) -> StoreResult<u64> {
        let body = serde_json::to_string(intent)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO mirror_outbox (intent) VALUES (?1)",
            params![body],
        )?;
        Ok(conn.last_insert_rowid() as u64)
    }

    fn clear_intent(&self, seq: u64) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM mirror_outbox WHERE seq = ?1",
            params![seq as i64],
        )?;
        Ok(())
    }

    fn pending_intents(&self) -> StoreResult<Vec<OutboxEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT seq, intent FROM mirror_outbox ORDER BY seq")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(seq, body)| {
                Ok(OutboxEntry {
                    seq: seq as u64,
                    intent: serde_json::from_str(&body)?,
                })
            })
            .collect()
    }
}
