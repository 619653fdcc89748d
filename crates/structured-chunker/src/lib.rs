//! # Structured Chunker
//!
//! Structure-aware chunking of markdown documents with embedded code for
//! embedding and retrieval.
//!
//! ## Philosophy
//!
//! The chunker creates bounded, individually coherent fragments that:
//! - Never split a fenced code block or a function/class definition mid-construct
//! - Carry their markdown section (title, level, breadcrumb) in metadata
//! - Repeat a sentence-aligned tail of the previous chunk as context
//! - Prefer content fidelity over the size target (oversized chunks are flagged)
//!
//! ## Architecture
//!
//! ```text
//! Document text
//!     │
//!     ├──> Block parsing (headers, paragraphs, code fences)
//!     │
//!     ├──> Atomic unit resolution
//!     │    └─> Declaration heuristics per fence language
//!     │
//!     ├──> Greedy packing
//!     │    ├─> Section breaks at headers
//!     │    ├─> Sentence-level paragraph splits
//!     │    └─> Fence splits at unit boundaries (re-wrapped in delimiters)
//!     │
//!     ├──> Overlap injection (fence-free trailing context)
//!     │
//!     └──> Metadata annotation → Chunk[]
//! ```
//!
//! ## Example
//!
//! ```rust
//! use structured_chunker::{ChunkType, Chunker, ChunkerConfig, Document};
//!
//! let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
//!
//! let doc = Document::new("# Intro\n\nHello world.\n\n```python\ndef f():\n    pass\n```\n")
//!     .with_metadata("url", "https://example.com/intro");
//!
//! let chunks = chunker.chunk_document(&doc).unwrap();
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].metadata.chunk_type, ChunkType::Code);
//! assert_eq!(chunks[0].metadata.section_title.as_deref(), Some("Intro"));
//! assert!(chunks[0].metadata.contained_functions.contains("f"));
//! ```

mod annotate;
mod atomic;
mod batch;
mod block;
mod chunker;
mod config;
mod error;
mod language;
mod overlap;
mod packer;
mod text;
mod types;

pub use annotate::annotate;
pub use atomic::{resolve_units, AtomicUnit, UnitKind};
pub use batch::chunk_concurrency_from_env;
pub use block::{parse_blocks, Block, CodeFence};
pub use chunker::{Chunker, ChunkingStats};
pub use config::ChunkerConfig;
pub use error::{ChunkerError, Result};
pub use language::{DeclKind, Declaration, Language};
pub use overlap::{OverlapInjector, OverlappedChunk};
pub use packer::{pack_blocks, ChunkPacker, PackedChunk, SectionState};
pub use types::{Chunk, ChunkMetadata, ChunkType, Document};
