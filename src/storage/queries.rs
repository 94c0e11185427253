//! Row-level operations on the translation memory

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::embedding::cosine_similarity;
use crate::error::Result;
use crate::types::{MemoryEntry, NewEntry};

/// Parse an entry from a database row
pub fn entry_from_row(row: &Row) -> rusqlite::Result<MemoryEntry> {
    let id: String = row.get("id")?;
    let source_text: String = row.get("source_text")?;
    let translation_text: String = row.get("translation_text")?;
    let blob: Vec<u8> = row.get("embedding")?;
    let reference_url: Option<String> = row.get("reference_url")?;
    let created_at: String = row.get("created_at")?;

    Ok(MemoryEntry {
        id,
        source_text,
        translation_text,
        embedding: embedding_from_blob(&blob),
        reference_url,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

/// Encode an embedding as a little-endian f32 blob
pub fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Decode a little-endian f32 blob back into an embedding
pub fn embedding_from_blob(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Upsert a pair by id, preserving `created_at` on conflict.
pub fn upsert_entry(conn: &Connection, entry: &NewEntry) -> Result<MemoryEntry> {
    let created_at = entry.created_at.unwrap_or_else(Utc::now).to_rfc3339();
    let blob = embedding_to_blob(&entry.embedding);

    conn.execute(
        "INSERT INTO translation_pairs
            (id, source_text, translation_text, embedding, dimensions, reference_url, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
            source_text = excluded.source_text,
            translation_text = excluded.translation_text,
            embedding = excluded.embedding,
            dimensions = excluded.dimensions,
            reference_url = excluded.reference_url",
        params![
            entry.id,
            entry.source_text,
            entry.translation_text,
            blob,
            entry.embedding.len() as i64,
            entry.reference_url,
            created_at,
        ],
    )?;

    // Read back so the caller sees the stored created_at, not its own
    let stored = get_entry(conn, &entry.id)?
        .ok_or_else(|| crate::error::RetellError::NotFound(entry.id.clone()))?;
    Ok(stored)
}

/// Fetch a single entry by id
pub fn get_entry(conn: &Connection, id: &str) -> Result<Option<MemoryEntry>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, source_text, translation_text, embedding, reference_url, created_at
         FROM translation_pairs
         WHERE id = ?",
    )?;

    match stmt.query_row(params![id], entry_from_row) {
        Ok(entry) => Ok(Some(entry)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Total number of stored pairs
pub fn count_entries(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM translation_pairs", [], |row| {
        row.get(0)
    })?;
    Ok(count)
}

/// Nearest neighbors by cosine similarity.
///
/// Similarity is computed in-process over every row whose stored
/// dimensionality matches the query; at this corpus size (one row per
/// published post) a linear scan beats maintaining an ANN index. Results
/// are ordered similarity descending with a deterministic tie-break
/// (`created_at` descending, then id) so repeated identical queries return
/// stable ordering.
pub fn similarity_search(
    conn: &Connection,
    query: &[f32],
    limit: usize,
) -> Result<Vec<(MemoryEntry, f32)>> {
    if query.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare_cached(
        "SELECT id, source_text, translation_text, embedding, reference_url, created_at
         FROM translation_pairs
         WHERE dimensions = ?",
    )?;

    let entries = stmt
        .query_map(params![query.len() as i64], entry_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut scored: Vec<(MemoryEntry, f32)> = entries
        .into_iter()
        .map(|entry| {
            let similarity = cosine_similarity(query, &entry.embedding);
            (entry, similarity)
        })
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.0.created_at.cmp(&a.0.created_at))
            .then_with(|| a.0.id.cmp(&b.0.id))
    });
    scored.truncate(limit);

    Ok(scored)
}
