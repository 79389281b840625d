use crate::error::StorageError;
use crate::graph::{Metadata, RelationType, WikiEdge, WikiGraph, WikiNode};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub struct Database {
    conn: Connection,
}

/// One stored mapping run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub root_title: String,
    pub max_depth: usize,
    pub include_errors: bool,
    /// Unix seconds.
    pub created_at: i64,
    pub total_nodes: usize,
    pub edge_count: usize,
    pub error_count: usize,
    pub max_depth_explored: usize,
}

fn metadata_to_json(metadata: &Metadata) -> Result<Option<String>, StorageError> {
    if metadata.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(metadata)?))
}

fn metadata_from_json(raw: Option<String>) -> Result<Metadata, StorageError> {
    match raw {
        Some(text) if !text.is_empty() => Ok(serde_json::from_str(&text)?),
        _ => Ok(Metadata::new()),
    }
}

impl Database {
    pub fn drop(path: &Path) -> std::io::Result<()> {
        fs::remove_file(path)
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        debug!("Opened database at {}", path.display());
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            "
CREATE TABLE IF NOT EXISTS map_sessions (
    id TEXT PRIMARY KEY,
    root_title TEXT NOT NULL,
    max_depth INTEGER NOT NULL CHECK(max_depth >= 1),
    include_errors BOOLEAN NOT NULL,
    created_at INTEGER NOT NULL,
    total_nodes INTEGER NOT NULL,
    error_count INTEGER NOT NULL,
    max_depth_explored INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS nodes (
    session_id TEXT NOT NULL,
    title TEXT NOT NULL,
    is_error BOOLEAN NOT NULL DEFAULT 0,
    metadata TEXT,            -- JSON object

    PRIMARY KEY(session_id, title),
    FOREIGN KEY(session_id) REFERENCES map_sessions(id) ON DELETE CASCADE
);

-- Edges keep insertion order; parallel edges are allowed
CREATE TABLE IF NOT EXISTS edges (
    session_id TEXT NOT NULL,
    seq INTEGER NOT NULL,
    source TEXT NOT NULL,
    target TEXT NOT NULL,
    rel_type TEXT NOT NULL,
    metadata TEXT,            -- JSON object

    PRIMARY KEY(session_id, seq),
    FOREIGN KEY(session_id) REFERENCES map_sessions(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(session_id, source);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(session_id, target);
CREATE INDEX IF NOT EXISTS idx_sessions_created ON map_sessions(created_at);
            ",
        )?;
        Ok(())
    }

    /// Stores `graph` as a new session and returns its id.
    pub fn save_graph(
        &self,
        graph: &WikiGraph,
        max_depth: usize,
        include_errors: bool,
    ) -> Result<String, StorageError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO map_sessions (
                id, root_title, max_depth, include_errors, created_at,
                total_nodes, error_count, max_depth_explored
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &session_id,
                graph.root_title(),
                max_depth as i64,
                include_errors,
                Utc::now().timestamp(),
                graph.total_nodes() as i64,
                graph.error_count() as i64,
                graph.max_depth_explored() as i64,
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO nodes (session_id, title, is_error, metadata) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for node in graph.nodes() {
                stmt.execute(params![
                    &session_id,
                    &node.title,
                    node.is_error,
                    metadata_to_json(&node.metadata)?,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO edges (session_id, seq, source, target, rel_type, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (seq, edge) in graph.edges().iter().enumerate() {
                stmt.execute(params![
                    &session_id,
                    seq as i64,
                    &edge.source,
                    &edge.target,
                    edge.rel_type.as_str(),
                    metadata_to_json(&edge.metadata)?,
                ])?;
            }
        }

        tx.commit()?;
        info!(
            "Saved map of '{}' as session {} ({} nodes, {} edges)",
            graph.root_title(),
            session_id,
            graph.total_nodes(),
            graph.edges().len()
        );
        Ok(session_id)
    }

    /// Rebuilds the graph stored under `session_id`.
    pub fn load_graph(&self, session_id: &str) -> Result<WikiGraph, StorageError> {
        let header = self
            .conn
            .query_row(
                "SELECT root_title, max_depth_explored FROM map_sessions WHERE id = ?1",
                params![session_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;
        let Some((root_title, max_depth_explored)) = header else {
            return Err(StorageError::SessionNotFound(session_id.to_string()));
        };

        let mut stmt = self.conn.prepare(
            "SELECT title, is_error, metadata FROM nodes WHERE session_id = ?1 ORDER BY title",
        )?;
        let node_rows = stmt
            .query_map(params![session_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, bool>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut nodes = Vec::with_capacity(node_rows.len());
        for (title, is_error, metadata) in node_rows {
            nodes.push(WikiNode {
                title,
                is_error,
                metadata: metadata_from_json(metadata)?,
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT source, target, rel_type, metadata FROM edges WHERE session_id = ?1 ORDER BY seq",
        )?;
        let edge_rows = stmt
            .query_map(params![session_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut edges = Vec::with_capacity(edge_rows.len());
        for (source, target, rel_type, metadata) in edge_rows {
            edges.push(WikiEdge {
                source,
                target,
                rel_type: RelationType::from(rel_type),
                metadata: metadata_from_json(metadata)?,
            });
        }

        let graph = WikiGraph::from_parts(&root_title, nodes, edges, max_depth_explored.max(0) as usize)?;
        debug!("Loaded session {} ({} nodes)", session_id, graph.total_nodes());
        Ok(graph)
    }

    /// Stored sessions, newest first.
    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.root_title, s.max_depth, s.include_errors, s.created_at,
                    s.total_nodes, s.error_count, s.max_depth_explored,
                    (SELECT COUNT(*) FROM edges e WHERE e.session_id = s.id)
             FROM map_sessions s
             ORDER BY s.created_at DESC, s.rowid DESC",
        )?;

        let sessions = stmt
            .query_map([], |row| {
                Ok(SessionSummary {
                    id: row.get(0)?,
                    root_title: row.get(1)?,
                    max_depth: row.get::<_, i64>(2)? as usize,
                    include_errors: row.get(3)?,
                    created_at: row.get(4)?,
                    total_nodes: row.get::<_, i64>(5)? as usize,
                    error_count: row.get::<_, i64>(6)? as usize,
                    max_depth_explored: row.get::<_, i64>(7)? as usize,
                    edge_count: row.get::<_, i64>(8)? as usize,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(sessions)
    }

    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }
}
