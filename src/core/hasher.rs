//! Content fingerprints for source files

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::core::errors::{Result, SyncError};
use crate::core::models::{FileMetadata, ParsedFile};

/// Hex SHA-256 of the content with surrounding whitespace removed
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.trim().as_bytes());
    hex::encode(hasher.finalize())
}

async fn read_source(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SyncError::file(path, e))
}

/// Read a file and fingerprint it
pub async fn hash_file(path: &Path) -> Result<FileMetadata> {
    let content = read_source(path).await?;
    Ok(FileMetadata {
        source_file_path: path.display().to_string(),
        file_hash: hash_content(&content),
    })
}

/// Read a file, keeping its text alongside the fingerprint
pub async fn parse_file(path: &Path) -> Result<ParsedFile> {
    let content = read_source(path).await?;
    Ok(ParsedFile {
        source_file_path: path.display().to_string(),
        file_hash: hash_content(&content),
        content,
    })
}
