//! Vector indexing of resume text for later retrieval during interviews.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Target chunk size in characters.
const CHUNK_CHARS: usize = 1_000;
/// Characters shared between consecutive chunks.
const CHUNK_OVERLAP: usize = 200;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("index API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("nothing to index")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexChunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkMetadata {
    pub resume_id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub chunk: usize,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Upserts chunks into the user's namespace. Chunk ids are stable per
    /// resume, so re-indexing after a redelivery overwrites instead of
    /// duplicating.
    async fn upsert(&self, namespace: &str, chunks: &[IndexChunk]) -> Result<(), IndexError>;
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    namespace: &'a str,
    records: &'a [IndexChunk],
}

/// Client for an HTTP vector store that embeds records server-side.
#[derive(Clone)]
pub struct HttpVectorIndex {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpVectorIndex {
    pub fn new(base_url: String, api_key: String) -> Result<Self, IndexError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()?,
            base_url,
            api_key,
        })
    }
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn upsert(&self, namespace: &str, chunks: &[IndexChunk]) -> Result<(), IndexError> {
        if chunks.is_empty() {
            return Err(IndexError::Empty);
        }
        let url = format!("{}/upsert", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&UpsertRequest {
                namespace,
                records: chunks,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IndexError::Api {
                status: status.as_u16(),
                message,
            });
        }
        debug!(namespace, chunks = chunks.len(), "Upserted resume chunks");
        Ok(())
    }
}

/// Splits resume text into overlapping chunks tagged for the index.
pub fn chunk_resume(resume_id: Uuid, user_id: Uuid, file_name: &str, text: &str) -> Vec<IndexChunk> {
    split_chunks(text, CHUNK_CHARS, CHUNK_OVERLAP)
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| IndexChunk {
            id: format!("{resume_id}#{i}"),
            text: chunk,
            metadata: ChunkMetadata {
                resume_id,
                user_id,
                file_name: file_name.to_string(),
                chunk: i,
            },
        })
        .collect()
}

fn split_chunks(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.trim().chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    let step = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}
