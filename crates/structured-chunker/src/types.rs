use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A source document handed over by a crawler
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// Raw markdown/code text
    pub content: String,

    /// Source metadata (url, title, category, ...) copied onto every chunk
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    /// Create a document without metadata
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Builder: add a metadata entry
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A bounded-size, independently embeddable piece of a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk text, including any overlap prefix
    pub content: String,

    /// Rich metadata about this chunk
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Create a new chunk
    #[must_use]
    pub const fn new(content: String, metadata: ChunkMetadata) -> Self {
        Self { content, metadata }
    }

    /// Chunk text without the overlap prefix copied from the previous chunk
    #[must_use]
    pub fn body(&self) -> &str {
        if self.metadata.overlap_chars == 0 {
            return &self.content;
        }
        // The prefix is followed by a blank-line separator.
        let skip = self.metadata.overlap_chars + 2;
        match self.content.char_indices().nth(skip) {
            Some((idx, _)) => &self.content[idx..],
            None => "",
        }
    }

    /// Overlap prefix copied from the previous chunk (empty for the first chunk)
    #[must_use]
    pub fn overlap(&self) -> &str {
        match self.content.char_indices().nth(self.metadata.overlap_chars) {
            Some((idx, _)) => &self.content[..idx],
            None => &self.content,
        }
    }

    /// Check if chunk content contains fenced code
    #[must_use]
    pub const fn has_code(&self) -> bool {
        self.metadata.has_code
    }

    /// Flat key/value view of the metadata for vector-store and relational
    /// loaders. Source entries come first; chunk fields win on key collisions.
    #[must_use]
    pub fn flat_metadata(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map: serde_json::Map<String, serde_json::Value> = self
            .metadata
            .source
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();

        if let Ok(serde_json::Value::Object(fields)) = serde_json::to_value(&self.metadata) {
            for (key, value) in fields {
                if key != "source" {
                    map.insert(key, value);
                }
            }
        }
        map
    }
}

/// Metadata attached to every chunk
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// Title of the nearest preceding header
    pub section_title: Option<String>,

    /// Level of that header (0 before the first header)
    pub section_level: u8,

    /// Header breadcrumb from the outermost section down to `section_title`
    #[serde(default)]
    pub section_path: Vec<String>,

    /// Chunk type (code, text, header)
    pub chunk_type: ChunkType,

    /// Language of the first fence in the chunk
    pub language: Option<String>,

    /// Chunk contains fenced code
    pub has_code: bool,

    /// Functions whose definitions intersect this chunk
    #[serde(default)]
    pub contained_functions: BTreeSet<String>,

    /// Classes whose definitions intersect this chunk
    #[serde(default)]
    pub contained_classes: BTreeSet<String>,

    /// Position in the document's chunk list
    pub chunk_index: usize,

    /// Number of chunks produced for the document
    pub total_chunks: usize,

    /// Pre-overlap length exceeds `chunk_size` to keep an atomic unit whole
    pub oversized: bool,

    /// Chunk holds a fence the document never closed
    pub unterminated: bool,

    /// Character count of `content`
    pub char_count: usize,

    /// Characters of overlap prefix at the start of `content`
    pub overlap_chars: usize,

    /// Source document metadata, verbatim
    #[serde(default)]
    pub source: BTreeMap<String, String>,
}

impl ChunkMetadata {
    /// Create metadata for a chunk type only
    #[must_use]
    pub fn with_type(chunk_type: ChunkType) -> Self {
        Self {
            chunk_type,
            ..Default::default()
        }
    }

    /// Builder: set section
    #[must_use]
    pub fn section(mut self, title: impl Into<String>, level: u8) -> Self {
        let title = title.into();
        self.section_path.push(title.clone());
        self.section_title = Some(title);
        self.section_level = level;
        self
    }

    /// Builder: add function name
    #[must_use]
    pub fn add_function(mut self, name: impl Into<String>) -> Self {
        self.contained_functions.insert(name.into());
        self.has_code = true;
        self
    }

    /// Builder: add class name
    #[must_use]
    pub fn add_class(mut self, name: impl Into<String>) -> Self {
        self.contained_classes.insert(name.into());
        self.has_code = true;
        self
    }
}

/// Kind of content a chunk carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    /// Contains fenced code
    Code,
    /// Prose only
    #[default]
    Text,
    /// A lone header line
    Header,
}

impl ChunkType {
    /// Get human-readable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Text => "text",
            Self::Header => "header",
        }
    }
}
