//! Splits extracted document text into overlapping fixed-size chunks.

use chrono::Utc;

use crate::models::chunk::{Chunk, SourceDocument};

pub const DEFAULT_CHUNK_SIZE: usize = 900;
pub const DEFAULT_CHUNK_OVERLAP: usize = 120;

/// Extracted text beyond this many characters is dropped before chunking.
pub const MAX_DOCUMENT_CHARS: usize = 20_000;

/// A segment is only cut back to its last space when that space sits past this offset.
const MIN_WORD_BREAK: usize = 200;

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Chunks `text` into windows of `size` characters, each starting `size - overlap`
/// characters after the previous one. Interior windows end on a word boundary
/// when one is available far enough into the window.
///
/// Works on characters, never bytes, so multi-byte text is never split mid-codepoint.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let cleaned = normalize_whitespace(text);
    if cleaned.is_empty() {
        return Vec::new();
    }

    let size = size.max(1);
    // the window must advance
    let overlap = overlap.min(size - 1);
    let chars: Vec<char> = cleaned.chars().collect();

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        let mut segment = &chars[start..end];

        if end < chars.len() {
            if let Some(last_space) = segment.iter().rposition(|c| *c == ' ') {
                if last_space > MIN_WORD_BREAK {
                    segment = &segment[..last_space];
                }
            }
        }

        let piece: String = segment.iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        if end >= chars.len() {
            break;
        }
        start = end - overlap;
    }
    chunks
}

/// Builds the source document record and its chunks for one ingested file.
pub fn chunk_document(doc_id: &str, name: &str, text: &str) -> (SourceDocument, Vec<Chunk>) {
    let capped: String = text.chars().take(MAX_DOCUMENT_CHARS).collect();
    let pieces = chunk_text(&capped, DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP);

    let chunks: Vec<Chunk> = pieces
        .into_iter()
        .enumerate()
        .map(|(i, text)| Chunk {
            id: format!("{doc_id}-{i}"),
            doc_id: doc_id.to_string(),
            text,
            order: i as i32,
        })
        .collect();

    let document = SourceDocument {
        id: doc_id.to_string(),
        name: name.to_string(),
        char_count: capped.chars().count() as i32,
        chunk_count: chunks.len() as i32,
        scanned_at: Utc::now(),
    };
    (document, chunks)
}
