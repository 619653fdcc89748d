use crate::annotate::annotate;
use crate::block::parse_blocks;
use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use crate::overlap::OverlapInjector;
use crate::packer::pack_blocks;
use crate::types::{Chunk, ChunkType, Document};
use std::collections::BTreeMap;

/// Main chunker interface for processing documents
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Create a new chunker, rejecting invalid configuration
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate().map_err(ChunkerError::invalid_config)?;
        Ok(Self { config })
    }

    /// Configuration this chunker was built with
    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Chunk a document, copying its metadata onto every chunk
    pub fn chunk_document(&self, document: &Document) -> Result<Vec<Chunk>> {
        self.chunk_str(&document.content, &document.metadata)
    }

    /// Chunk raw bytes; fails when they are not UTF-8 text
    pub fn chunk_bytes(
        &self,
        bytes: &[u8],
        metadata: &BTreeMap<String, String>,
    ) -> Result<Vec<Chunk>> {
        let text = std::str::from_utf8(bytes)
            .map_err(|err| ChunkerError::decode(err.valid_up_to(), "invalid UTF-8"))?;
        self.chunk_str(text, metadata)
    }

    /// Chunk document text
    pub fn chunk_str(&self, text: &str, metadata: &BTreeMap<String, String>) -> Result<Vec<Chunk>> {
        if let Some(offset) = text.find('\0') {
            return Err(ChunkerError::decode(offset, "NUL byte in input, content looks binary"));
        }
        if text.trim().is_empty() {
            log::debug!("empty document, no chunks");
            return Ok(Vec::new());
        }

        let blocks = parse_blocks(text);
        let packed = pack_blocks(&blocks, &self.config);
        let overlapped = OverlapInjector::new(self.config.chunk_overlap).apply(packed);
        let chunks = annotate(overlapped, metadata);

        log::debug!(
            "chunked {} chars into {} chunks",
            text.chars().count(),
            chunks.len()
        );
        Ok(chunks)
    }

    /// Chunk several documents in order and flatten the results
    pub fn split_documents(&self, documents: &[Document]) -> Result<Vec<Chunk>> {
        let mut all = Vec::new();
        for document in documents {
            all.extend(self.chunk_document(document)?);
        }
        Ok(all)
    }

    /// Get chunking statistics
    #[must_use]
    pub fn get_stats(chunks: &[Chunk]) -> ChunkingStats {
        let sizes = || chunks.iter().map(|c| c.metadata.char_count);
        let total_chars: usize = sizes().sum();

        ChunkingStats {
            total_chunks: chunks.len(),
            total_chars,
            avg_chars_per_chunk: if chunks.is_empty() {
                0
            } else {
                total_chars / chunks.len()
            },
            min_chars: sizes().min().unwrap_or(0),
            max_chars: sizes().max().unwrap_or(0),
            code_chunks: chunks
                .iter()
                .filter(|c| c.metadata.chunk_type == ChunkType::Code)
                .count(),
            oversized_chunks: chunks.iter().filter(|c| c.metadata.oversized).count(),
        }
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            config: ChunkerConfig::default(),
        }
    }
}

/// Statistics about chunking results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub total_chars: usize,
    pub avg_chars_per_chunk: usize,
    pub min_chars: usize,
    pub max_chars: usize,
    pub code_chunks: usize,
    pub oversized_chunks: usize,
}

impl std::fmt::Display for ChunkingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunks: {} | Chars: {} | Avg: {} | Range: {}-{} | Code: {} | Oversized: {}",
            self.total_chunks,
            self.total_chars,
            self.avg_chars_per_chunk,
            self.min_chars,
            self.max_chars,
            self.code_chunks,
            self.oversized_chunks
        )
    }
}
