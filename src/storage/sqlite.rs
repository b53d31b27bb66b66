//! SQLite storage backend

use super::batch::{MergeBatch, MergeOp};
use super::traits::{
    ApplyStats, GraphStore, MergeOutcome, OpenStore, StorageError, StorageResult,
};
use crate::graph::{Edge, EdgeId, EdgeKind, Node, NodeId, NodeKey, NodeKind, Properties};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

/// SQLite-backed graph store.
///
/// One database file, one table per entity class. The natural key is stored
/// as canonical JSON with a unique index on (kind, key_json), so the merge
/// contract holds across restarts. Edges cascade-delete with their
/// endpoints, which keeps `delete_batch` a single bounded statement.
/// Thread-safe via internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                key_json TEXT NOT NULL,
                properties_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (kind, key_json)
            );

            CREATE INDEX IF NOT EXISTS idx_nodes_kind ON nodes(kind);

            CREATE TABLE IF NOT EXISTS edges (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                properties_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (kind, source_id, target_id),
                FOREIGN KEY (source_id) REFERENCES nodes(id) ON DELETE CASCADE,
                FOREIGN KEY (target_id) REFERENCES nodes(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_edges_kind ON edges(kind);
            CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id);
            CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);

            -- Enable cascading deletes from nodes to incident edges
            PRAGMA foreign_keys = ON;

            -- WAL for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn parse_node_id(text: &str) -> StorageResult<NodeId> {
        Uuid::parse_str(text)
            .map(NodeId::from_uuid)
            .map_err(|e| StorageError::Corrupted(format!("bad node id '{}': {}", text, e)))
    }

    fn parse_edge_id(text: &str) -> StorageResult<EdgeId> {
        Uuid::parse_str(text)
            .map(EdgeId::from_uuid)
            .map_err(|e| StorageError::Corrupted(format!("bad edge id '{}': {}", text, e)))
    }

    fn parse_created_at(text: &str) -> StorageResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StorageError::DateParse(e.to_string()))
    }

    fn resolve_on(conn: &Connection, key: &NodeKey) -> StorageResult<Option<NodeId>> {
        let key_json = serde_json::to_string(key)?;
        let id_text: Option<String> = conn
            .query_row(
                "SELECT id FROM nodes WHERE kind = ?1 AND key_json = ?2",
                params![key.kind().as_str(), key_json],
                |row| row.get(0),
            )
            .optional()?;
        id_text.map(|text| Self::parse_node_id(&text)).transpose()
    }

    fn merge_node_on(
        conn: &Connection,
        key: &NodeKey,
        on_create: &Properties,
        on_match: &Properties,
    ) -> StorageResult<MergeOutcome<NodeId>> {
        let kind = key.kind().as_str();
        let key_json = serde_json::to_string(key)?;

        let existing: Option<(String, String)> = conn
            .query_row(
                "SELECT id, properties_json FROM nodes WHERE kind = ?1 AND key_json = ?2",
                params![kind, key_json],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match existing {
            Some((id_text, properties_json)) => {
                let id = Self::parse_node_id(&id_text)?;
                if !on_match.is_empty() {
                    let mut properties: Properties = serde_json::from_str(&properties_json)?;
                    properties.extend(on_match.clone());
                    conn.execute(
                        "UPDATE nodes SET properties_json = ?1 WHERE id = ?2",
                        params![serde_json::to_string(&properties)?, id_text],
                    )?;
                }
                Ok(MergeOutcome { id, created: false })
            }
            None => {
                let node = Node::new(key.clone(), on_create.clone());
                conn.execute(
                    "INSERT INTO nodes (id, kind, key_json, properties_json, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        node.id.to_string(),
                        kind,
                        key_json,
                        serde_json::to_string(&node.properties)?,
                        node.created_at.to_rfc3339(),
                    ],
                )?;
                Ok(MergeOutcome { id: node.id, created: true })
            }
        }
    }

    fn merge_edge_on(
        conn: &Connection,
        kind: EdgeKind,
        source: NodeId,
        target: NodeId,
        on_create: &Properties,
        on_match: &Properties,
    ) -> StorageResult<MergeOutcome<EdgeId>> {
        for endpoint in [source, target] {
            let exists: bool = conn.query_row(
                "SELECT COUNT(*) > 0 FROM nodes WHERE id = ?1",
                params![endpoint.to_string()],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(StorageError::NodeNotFound(endpoint.to_string()));
            }
        }

        let existing: Option<(String, String)> = conn
            .query_row(
                "SELECT id, properties_json FROM edges
                 WHERE kind = ?1 AND source_id = ?2 AND target_id = ?3",
                params![kind.as_str(), source.to_string(), target.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match existing {
            Some((id_text, properties_json)) => {
                let id = Self::parse_edge_id(&id_text)?;
                if !on_match.is_empty() {
                    let mut properties: Properties = serde_json::from_str(&properties_json)?;
                    properties.extend(on_match.clone());
                    conn.execute(
                        "UPDATE edges SET properties_json = ?1 WHERE id = ?2",
                        params![serde_json::to_string(&properties)?, id_text],
                    )?;
                }
                Ok(MergeOutcome { id, created: false })
            }
            None => {
                let edge = Edge::new(kind, source, target, on_create.clone());
                conn.execute(
                    "INSERT INTO edges (id, kind, source_id, target_id, properties_json, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        edge.id.to_string(),
                        kind.as_str(),
                        source.to_string(),
                        target.to_string(),
                        serde_json::to_string(&edge.properties)?,
                        edge.created_at.to_rfc3339(),
                    ],
                )?;
                Ok(MergeOutcome { id: edge.id, created: true })
            }
        }
    }

    fn row_to_node(
        id: String,
        key_json: String,
        properties_json: String,
        created_at: String,
    ) -> StorageResult<Node> {
        Ok(Node {
            id: Self::parse_node_id(&id)?,
            key: serde_json::from_str(&key_json)?,
            properties: serde_json::from_str(&properties_json)?,
            created_at: Self::parse_created_at(&created_at)?,
        })
    }

    fn row_to_edge(
        id: String,
        kind: EdgeKind,
        source_id: String,
        target_id: String,
        properties_json: String,
        created_at: String,
    ) -> StorageResult<Edge> {
        Ok(Edge {
            id: Self::parse_edge_id(&id)?,
            kind,
            source: Self::parse_node_id(&source_id)?,
            target: Self::parse_node_id(&target_id)?,
            properties: serde_json::from_str(&properties_json)?,
            created_at: Self::parse_created_at(&created_at)?,
        })
    }
}

impl GraphStore for SqliteStore {
    fn merge_node(
        &self,
        key: &NodeKey,
        on_create: &Properties,
        on_match: &Properties,
    ) -> StorageResult<MergeOutcome<NodeId>> {
        let conn = self.conn.lock().unwrap();
        Self::merge_node_on(&conn, key, on_create, on_match)
    }

    fn merge_edge(
        &self,
        kind: EdgeKind,
        source: NodeId,
        target: NodeId,
        on_create: &Properties,
        on_match: &Properties,
    ) -> StorageResult<MergeOutcome<EdgeId>> {
        let conn = self.conn.lock().unwrap();
        Self::merge_edge_on(&conn, kind, source, target, on_create, on_match)
    }

    fn apply(&self, batch: &MergeBatch) -> StorageResult<ApplyStats> {
        let external = batch.validate().map_err(StorageError::Rejected)?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        for key in external {
            if Self::resolve_on(&tx, key)?.is_none() {
                // Dropping the transaction rolls back
                return Err(StorageError::Rejected(format!(
                    "edge endpoint not found: {:?}",
                    key
                )));
            }
        }

        let mut stats = ApplyStats::default();
        for op in batch.ops() {
            match op {
                MergeOp::Node { key, on_create, on_match } => {
                    let outcome = Self::merge_node_on(&tx, key, on_create, on_match)?;
                    stats.node(&outcome);
                }
                MergeOp::Edge { kind, source, target, on_create, on_match } => {
                    let source_id = Self::resolve_on(&tx, source)?
                        .ok_or_else(|| StorageError::NodeNotFound(format!("{:?}", source)))?;
                    let target_id = Self::resolve_on(&tx, target)?
                        .ok_or_else(|| StorageError::NodeNotFound(format!("{:?}", target)))?;
                    let outcome =
                        Self::merge_edge_on(&tx, *kind, source_id, target_id, on_create, on_match)?;
                    stats.edge(&outcome);
                }
            }
        }

        tx.commit()?;
        Ok(stats)
    }

    fn resolve(&self, key: &NodeKey) -> StorageResult<Option<NodeId>> {
        let conn = self.conn.lock().unwrap();
        Self::resolve_on(&conn, key)
    }

    fn node(&self, id: NodeId) -> StorageResult<Option<Node>> {
        let conn = self.conn.lock().unwrap();
        let row: Option<(String, String, String)> = conn
            .query_row(
                "SELECT key_json, properties_json, created_at FROM nodes WHERE id = ?1",
                params![id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        row.map(|(key_json, properties_json, created_at)| {
            Self::row_to_node(id.to_string(), key_json, properties_json, created_at)
        })
        .transpose()
    }

    fn nodes_of(&self, kind: NodeKind) -> StorageResult<Vec<Node>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, key_json, properties_json, created_at FROM nodes WHERE kind = ?1",
        )?;
        let rows = stmt.query_map(params![kind.as_str()], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?;

        let mut nodes = Vec::new();
        for row in rows {
            let (id, key_json, properties_json, created_at): (String, String, String, String) =
                row?;
            nodes.push(Self::row_to_node(id, key_json, properties_json, created_at)?);
        }
        Ok(nodes)
    }

    fn edges_of(&self, kind: EdgeKind) -> StorageResult<Vec<Edge>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, source_id, target_id, properties_json, created_at
             FROM edges WHERE kind = ?1",
        )?;
        let rows = stmt.query_map(params![kind.as_str()], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })?;

        let mut edges = Vec::new();
        for row in rows {
            let (id, source_id, target_id, properties_json, created_at): (
                String,
                String,
                String,
                String,
                String,
            ) = row?;
            edges.push(Self::row_to_edge(
                id,
                kind,
                source_id,
                target_id,
                properties_json,
                created_at,
            )?);
        }
        Ok(edges)
    }

    fn count_nodes(&self, kind: NodeKind) -> StorageResult<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM nodes WHERE kind = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn delete_batch(&self, limit: usize) -> StorageResult<u64> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM nodes WHERE id IN (SELECT id FROM nodes LIMIT ?1)",
            params![limit as i64],
        )?;
        Ok(deleted as u64)
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self { conn: Mutex::new(conn) })
    }
}
