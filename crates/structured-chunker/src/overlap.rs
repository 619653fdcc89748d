use crate::block::{is_fence_close, parse_fence_open};
use crate::packer::PackedChunk;
use crate::text::{char_len, tail_start};

/// A packed chunk with trailing context of its predecessor prepended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlappedChunk {
    pub packed: PackedChunk,
    /// Final content: overlap prefix, blank line, packed content
    pub content: String,
    /// Characters of overlap prefix (separator excluded)
    pub overlap_chars: usize,
}

/// Prepends sentence-aligned, fence-free context from the previous chunk.
pub struct OverlapInjector {
    overlap_chars: usize,
}

impl OverlapInjector {
    pub fn new(overlap_chars: usize) -> Self {
        Self { overlap_chars }
    }

    /// Apply overlap to every chunk after the first
    pub fn apply(&self, chunks: Vec<PackedChunk>) -> Vec<OverlappedChunk> {
        let mut out: Vec<OverlappedChunk> = Vec::with_capacity(chunks.len());
        let mut previous: Option<String> = None;

        for packed in chunks {
            let prefix = previous
                .as_deref()
                .and_then(|prev| self.overlap_for(prev))
                .map(str::to_string);
            previous = Some(packed.content.clone());

            let chunk = match prefix {
                Some(prefix) => OverlappedChunk {
                    content: format!("{prefix}\n\n{}", packed.content),
                    overlap_chars: char_len(&prefix),
                    packed,
                },
                None => OverlappedChunk {
                    content: packed.content.clone(),
                    overlap_chars: 0,
                    packed,
                },
            };
            out.push(chunk);
        }

        out
    }

    /// Overlap text taken from a previous chunk's pre-overlap content
    pub fn overlap_for<'a>(&self, previous: &'a str) -> Option<&'a str> {
        if self.overlap_chars == 0 {
            return None;
        }
        let source = prose_source(previous);
        let tail = source[tail_start(source, self.overlap_chars)..].trim();
        (!tail.is_empty()).then_some(tail)
    }
}

/// Non-fence text an overlap may be drawn from.
///
/// This is the text after the last fence; when the content ends with (or
/// inside) a fence, it is the text between that fence's opening line and the
/// fence before it.
fn prose_source(content: &str) -> &str {
    // (opening line start, end after closing line; None when unterminated)
    let mut fences: Vec<(usize, Option<usize>)> = Vec::new();
    let mut open: Option<(usize, usize)> = None;
    let mut offset = 0;

    for raw in content.split_inclusive('\n') {
        let line = raw.trim_end_matches(['\n', '\r']);
        match open {
            Some((start, marker_len)) => {
                if is_fence_close(line, marker_len) {
                    fences.push((start, Some(offset + raw.len())));
                    open = None;
                }
            }
            None => {
                if let Some((marker_len, _)) = parse_fence_open(line) {
                    open = Some((offset, marker_len));
                }
            }
        }
        offset += raw.len();
    }
    if let Some((start, _)) = open {
        fences.push((start, None));
    }

    let Some(&(last_start, last_end)) = fences.last() else {
        return content;
    };
    if let Some(end) = last_end {
        if !content[end..].trim().is_empty() {
            return &content[end..];
        }
    }
    let before = fences
        .len()
        .checked_sub(2)
        .and_then(|i| fences[i].1)
        .unwrap_or(0);
    &content[before..last_start]
}
