use crate::overlap::OverlappedChunk;
use crate::text::char_len;
use crate::types::{Chunk, ChunkMetadata, ChunkType};
use std::collections::BTreeMap;

/// Turn overlapped chunks into final [`Chunk`]s with full metadata.
///
/// Indices are assigned in document order; every chunk gets a copy of the
/// source metadata.
#[must_use]
pub fn annotate(chunks: Vec<OverlappedChunk>, source: &BTreeMap<String, String>) -> Vec<Chunk> {
    let total_chunks = chunks.len();

    chunks
        .into_iter()
        .enumerate()
        .map(|(chunk_index, chunk)| {
            let OverlappedChunk {
                packed,
                content,
                overlap_chars,
            } = chunk;

            let chunk_type = if packed.has_code {
                ChunkType::Code
            } else if packed.header_only {
                ChunkType::Header
            } else {
                ChunkType::Text
            };

            let metadata = ChunkMetadata {
                section_title: packed.section.title,
                section_level: packed.section.level,
                section_path: packed.section.path,
                chunk_type,
                language: packed.language,
                has_code: packed.has_code,
                contained_functions: packed.functions,
                contained_classes: packed.classes,
                chunk_index,
                total_chunks,
                oversized: packed.oversized,
                unterminated: packed.unterminated,
                char_count: char_len(&content),
                overlap_chars,
                source: source.clone(),
            };
            Chunk::new(content, metadata)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packer::{PackedChunk, SectionState};
    use pretty_assertions::assert_eq;

    fn overlapped(packed: PackedChunk, prefix: Option<&str>) -> OverlappedChunk {
        match prefix {
            Some(prefix) => OverlappedChunk {
                content: format!("{prefix}\n\n{}", packed.content),
                overlap_chars: char_len(prefix),
                packed,
            },
            None => OverlappedChunk {
                content: packed.content.clone(),
                overlap_chars: 0,
                packed,
            },
        }
    }

    #[test]
    fn assigns_types_indices_and_source() {
        let header = PackedChunk {
            content: "# Title".to_string(),
            header_only: true,
            section: SectionState {
                title: Some("Title".to_string()),
                level: 1,
                path: vec!["Title".to_string()],
            },
            ..Default::default()
        };
        let code = PackedChunk {
            content: "```py\nx = 1\n```".to_string(),
            has_code: true,
            language: Some("py".to_string()),
            ..Default::default()
        };
        let text = PackedChunk {
            content: "Plain words.".to_string(),
            ..Default::default()
        };

        let mut source = BTreeMap::new();
        source.insert("url".to_string(), "https://docs.example.com".to_string());

        let chunks = annotate(
            vec![
                overlapped(header, None),
                overlapped(code, None),
                overlapped(text, Some("Tail.")),
            ],
            &source,
        );

        let types: Vec<_> = chunks.iter().map(|c| c.metadata.chunk_type).collect();
        assert_eq!(types, vec![ChunkType::Header, ChunkType::Code, ChunkType::Text]);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.chunk_index, i);
            assert_eq!(chunk.metadata.total_chunks, 3);
            assert_eq!(chunk.metadata.source, source);
        }
        assert_eq!(chunks[0].metadata.section_title.as_deref(), Some("Title"));
        assert_eq!(chunks[1].metadata.language.as_deref(), Some("py"));
        assert_eq!(chunks[2].metadata.overlap_chars, 5);
        assert_eq!(chunks[2].metadata.char_count, "Tail.\n\nPlain words.".len());
        assert_eq!(chunks[2].body(), "Plain words.");
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(annotate(Vec::new(), &BTreeMap::new()).is_empty());
    }
}
