//! SQLite persistence for pages.
//!
//! One row per page, one row per block and one row per retired block ID. A
//! save replaces the page's rows inside a transaction, so a reader never sees
//! half a page. The async adapter runs every query on the blocking pool.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Result as SqliteResult, params};

use pagecraft_store::PageSnapshot;
use pagecraft_types::{Block, BlockContent, BlockId, OrderKey, PageId};

use crate::persistence::{PagePersistence, SaveError};

const SCHEMA: &str = r#"
-- Pages (one row per saved page)
CREATE TABLE IF NOT EXISTS pages (
    id TEXT PRIMARY KEY,
    revision INTEGER NOT NULL,
    saved_at INTEGER DEFAULT (unixepoch())
);

-- Blocks (replaced wholesale on every save)
CREATE TABLE IF NOT EXISTS blocks (
    page_id TEXT NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
    id TEXT NOT NULL,
    position INTEGER NOT NULL,
    order_key TEXT NOT NULL,
    kind TEXT NOT NULL,
    content TEXT NOT NULL,
    ai_generated INTEGER NOT NULL,
    version INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (page_id, id)
);
CREATE INDEX IF NOT EXISTS idx_blocks_page ON blocks(page_id, position);

-- IDs of removed blocks (never reused)
CREATE TABLE IF NOT EXISTS retired_blocks (
    page_id TEXT NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
    id TEXT NOT NULL,
    PRIMARY KEY (page_id, id)
);
"#;

/// Page store backed by a SQLite database.
#[derive(Clone)]
pub struct SqlitePersistence {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePersistence {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> SqliteResult<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> SqliteResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> SqliteResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Write a snapshot. Returns `false` if a newer revision was already
    /// stored and the snapshot was skipped.
    pub fn save_snapshot(&self, snapshot: &PageSnapshot) -> Result<bool, SaveError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let page_id = snapshot.page_id.to_string();
        let stored: Option<i64> = tx
            .query_row(
                "SELECT revision FROM pages WHERE id = ?1",
                params![page_id],
                |row| row.get(0),
            )
            .optional()?;
        if stored.is_some_and(|rev| rev > snapshot.revision as i64) {
            return Ok(false);
        }

        tx.execute(
            "INSERT INTO pages (id, revision, saved_at) VALUES (?1, ?2, unixepoch())
             ON CONFLICT(id) DO UPDATE SET revision = excluded.revision, saved_at = excluded.saved_at",
            params![page_id, snapshot.revision as i64],
        )?;
        tx.execute("DELETE FROM blocks WHERE page_id = ?1", params![page_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO blocks (page_id, id, position, order_key, kind, content,
                                     ai_generated, version, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for (position, block) in snapshot.blocks.iter().enumerate() {
                stmt.execute(params![
                    page_id,
                    block.id.to_string(),
                    position as i64,
                    block.order.as_str(),
                    block.kind().as_str(),
                    serde_json::to_string(&block.content)?,
                    block.ai_generated,
                    block.version as i64,
                    block.created_at as i64,
                    block.updated_at as i64,
                ])?;
            }
        }
        tx.execute("DELETE FROM retired_blocks WHERE page_id = ?1", params![page_id])?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO retired_blocks (page_id, id) VALUES (?1, ?2)")?;
            for id in &snapshot.retired {
                stmt.execute(params![page_id, id.to_string()])?;
            }
        }
        tx.commit()?;

        tracing::debug!(page = %snapshot.page_id.short(), revision = snapshot.revision, blocks = snapshot.blocks.len(), "saved page");
        Ok(true)
    }

    /// Read the stored snapshot of a page.
    pub fn load_snapshot(&self, page_id: PageId) -> Result<Option<PageSnapshot>, SaveError> {
        let conn = self.conn.lock();
        let key = page_id.to_string();

        let revision: Option<i64> = conn
            .query_row(
                "SELECT revision FROM pages WHERE id = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        let Some(revision) = revision else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT id, order_key, content, ai_generated, version, created_at, updated_at
             FROM blocks WHERE page_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![key], |row| {
            Ok(BlockRow {
                id: row.get(0)?,
                order_key: row.get(1)?,
                content: row.get(2)?,
                ai_generated: row.get(3)?,
                version: row.get(4)?,
                created_at: row.get(5)?,
                updated_at: row.get(6)?,
            })
        })?;

        let mut blocks = Vec::new();
        for row in rows {
            blocks.push(row?.into_block()?);
        }

        let mut stmt = conn.prepare("SELECT id FROM retired_blocks WHERE page_id = ?1")?;
        let ids = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
        let mut retired = Vec::new();
        for id in ids {
            let id = id?;
            retired.push(
                BlockId::parse(&id)
                    .map_err(|e| SaveError::Serialization(format!("retired id {id}: {e}")))?,
            );
        }
        retired.sort();

        Ok(Some(PageSnapshot {
            page_id,
            revision: revision as u64,
            blocks,
            retired,
        }))
    }
}

struct BlockRow {
    id: String,
    order_key: String,
    content: String,
    ai_generated: bool,
    version: i64,
    created_at: i64,
    updated_at: i64,
}

impl BlockRow {
    fn into_block(self) -> Result<Block, SaveError> {
        let id = BlockId::parse(&self.id)
            .map_err(|e| SaveError::Serialization(format!("block id {}: {e}", self.id)))?;
        let order = OrderKey::parse(&self.order_key)
            .ok_or_else(|| SaveError::Serialization(format!("order key {:?}", self.order_key)))?;
        let content: BlockContent = serde_json::from_str(&self.content)?;
        Ok(Block {
            id,
            order,
            content,
            ai_generated: self.ai_generated,
            version: self.version as u64,
            created_at: self.created_at as u64,
            updated_at: self.updated_at as u64,
        })
    }
}

#[async_trait]
impl PagePersistence for SqlitePersistence {
    async fn save(&self, snapshot: &PageSnapshot) -> Result<(), SaveError> {
        let db = self.clone();
        let snapshot = snapshot.clone();
        tokio::task::spawn_blocking(move || db.save_snapshot(&snapshot).map(|_| ()))
            .await
            .map_err(|e| SaveError::Backend(format!("spawn_blocking: {e}")))?
    }

    async fn load(&self, page_id: PageId) -> Result<Option<PageSnapshot>, SaveError> {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.load_snapshot(page_id))
            .await
            .map_err(|e| SaveError::Backend(format!("spawn_blocking: {e}")))?
    }
}
