//! Greedy single-pass packing of blocks into size-bounded chunks.
//!
//! Atomicity dominates the size target: a fence span or declaration that does
//! not fit an empty buffer is emitted whole as an oversized chunk. Paragraph
//! text is the only divisible content.

use crate::atomic::{resolve_units, AtomicUnit};
use crate::block::{Block, CodeFence};
use crate::config::ChunkerConfig;
use crate::text::{char_len, fits, Splitter};
use std::collections::BTreeSet;

const SEPARATOR: &str = "\n\n";
const SEPARATOR_LEN: usize = 2;

/// Section state at the time a chunk was started
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionState {
    pub title: Option<String>,
    pub level: u8,
    /// Titles from the outermost open header down to `title`
    pub path: Vec<String>,
}

impl SectionState {
    fn from_stack(stack: &[(u8, String)]) -> Self {
        match stack.last() {
            Some((level, title)) => Self {
                title: Some(title.clone()),
                level: *level,
                path: stack.iter().map(|(_, t)| t.clone()).collect(),
            },
            None => Self::default(),
        }
    }
}

/// A chunk as produced by packing, before overlap and annotation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedChunk {
    pub content: String,
    pub section: SectionState,
    pub functions: BTreeSet<String>,
    pub classes: BTreeSet<String>,
    /// Language of the first fence placed in the chunk
    pub language: Option<String>,
    pub has_code: bool,
    pub unterminated: bool,
    /// The chunk is a single header line
    pub header_only: bool,
    /// Character count of `content`
    pub char_count: usize,
    pub oversized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentKind {
    Header,
    Text,
    Code,
}

#[derive(Default)]
struct Buffer {
    segments: Vec<(SegmentKind, String)>,
    len: usize,
    section: Option<SectionState>,
    functions: BTreeSet<String>,
    classes: BTreeSet<String>,
    language: Option<String>,
    unterminated: bool,
}

impl Buffer {
    fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Packs an ordered block stream into chunks under one [`ChunkerConfig`].
pub struct ChunkPacker<'a> {
    config: &'a ChunkerConfig,
    headers: Vec<(u8, String)>,
    buffer: Buffer,
    chunks: Vec<PackedChunk>,
}

impl<'a> ChunkPacker<'a> {
    pub fn new(config: &'a ChunkerConfig) -> Self {
        Self {
            config,
            headers: Vec::new(),
            buffer: Buffer::default(),
            chunks: Vec::new(),
        }
    }

    /// Pack all blocks in document order
    pub fn pack(mut self, blocks: &[Block]) -> Vec<PackedChunk> {
        for block in blocks {
            match block {
                Block::Header { level, text } => self.push_header(*level, text, block.render()),
                Block::Paragraph { text } => self.push_paragraph(text),
                Block::CodeFence(fence) => self.push_fence(fence),
            }
        }
        self.flush();

        log::debug!(
            "packed {} blocks into {} chunks ({} oversized)",
            blocks.len(),
            self.chunks.len(),
            self.chunks.iter().filter(|c| c.oversized).count()
        );
        self.chunks
    }

    fn remaining(&self) -> usize {
        if self.buffer.is_empty() {
            self.config.chunk_size
        } else {
            self.config
                .chunk_size
                .saturating_sub(self.buffer.len + SEPARATOR_LEN)
        }
    }

    fn push(&mut self, kind: SegmentKind, text: String) {
        if self.buffer.is_empty() {
            self.buffer.section = Some(SectionState::from_stack(&self.headers));
        } else {
            self.buffer.len += SEPARATOR_LEN;
        }
        self.buffer.len += char_len(&text);
        self.buffer.segments.push((kind, text));
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let buffer = std::mem::take(&mut self.buffer);
        let header_only = matches!(buffer.segments.as_slice(), [(SegmentKind::Header, _)]);
        let has_code = buffer
            .segments
            .iter()
            .any(|(kind, _)| *kind == SegmentKind::Code);
        let content = buffer
            .segments
            .into_iter()
            .map(|(_, text)| text)
            .collect::<Vec<_>>()
            .join(SEPARATOR);

        self.chunks.push(PackedChunk {
            content,
            section: buffer.section.unwrap_or_default(),
            functions: buffer.functions,
            classes: buffer.classes,
            language: buffer.language,
            has_code,
            unterminated: buffer.unterminated,
            header_only,
            char_count: buffer.len,
            oversized: buffer.len > self.config.chunk_size,
        });
    }

    /// Flush first when a segment of `len` characters cannot join the buffer
    fn make_room(&mut self, len: usize) {
        if !self.buffer.is_empty() && len > self.remaining() {
            self.flush();
        }
    }

    /// Emit a just-placed segment as its own chunk when it alone exceeds `chunk_size`
    fn seal_if_oversized(&mut self, len: usize) {
        if len <= self.config.chunk_size {
            return;
        }
        if len > self.config.code_block_max_size {
            log::warn!(
                "atomic unit of {len} chars exceeds code_block_max_size ({}); emitting it whole",
                self.config.code_block_max_size
            );
        } else {
            log::debug!(
                "atomic unit of {len} chars exceeds chunk_size ({}); emitting it whole",
                self.config.chunk_size
            );
        }
        self.flush();
    }

    /// Place a segment that must not be split
    fn push_atomic(&mut self, kind: SegmentKind, text: String) {
        let len = char_len(&text);
        self.make_room(len);
        self.push(kind, text);
        self.seal_if_oversized(len);
    }

    fn push_header(&mut self, level: u8, title: &str, line: String) {
        if self.config.preserve_markdown_structure {
            self.flush();
        }
        while self.headers.last().is_some_and(|(l, _)| *l >= level) {
            self.headers.pop();
        }
        self.headers.push((level, title.to_string()));
        self.push_atomic(SegmentKind::Header, line);
    }

    fn push_paragraph(&mut self, text: &str) {
        let splitter = Splitter::new(text.trim());
        let text = splitter.text();
        let mut from = 0;
        while from < text.len() {
            let rest = &text[from..];
            let remaining = self.remaining();
            if fits(rest, remaining) {
                self.push(SegmentKind::Text, rest.to_string());
                return;
            }

            // A raw character cut is only worth it when the buffer would
            // otherwise be flushed with nothing but headers.
            let allow_char_cut = self
                .buffer
                .segments
                .iter()
                .all(|(kind, _)| *kind == SegmentKind::Header);
            match splitter.cut(from, remaining, allow_char_cut) {
                Some(cut) => {
                    self.push(SegmentKind::Text, text[from..cut].trim_end().to_string());
                    self.flush();
                    from = text.len() - text[cut..].trim_start().len();
                }
                None => self.flush(),
            }
        }
    }

    fn push_fence(&mut self, fence: &CodeFence) {
        let units = resolve_units(fence);
        let whole = char_len(&fence.render());

        let keep_whole = !fence.closed
            || (self.config.preserve_code_blocks && whole <= self.config.code_block_max_size);
        if keep_whole {
            self.place_fence_span(fence, &units, 0, fence.text.len());
            return;
        }

        let spans: Vec<(usize, usize)> = if self.config.preserve_functions {
            units.iter().map(|u| (u.start, u.end)).collect()
        } else {
            line_spans(&fence.text)
        };
        // Blank-only spans would render as empty fences; they are only
        // emitted as part of a group.
        let spans: Vec<(usize, usize)> = spans
            .into_iter()
            .filter(|&(start, end)| !fence.text[start..end].trim().is_empty())
            .collect();
        if spans.is_empty() {
            self.place_fence_span(fence, &units, 0, fence.text.len());
            return;
        }
        log::debug!(
            "splitting {whole}-char fence into at most {} spans",
            spans.len()
        );

        // Consecutive spans share one re-emitted fence while they fit.
        let mut group_start: Option<usize> = None;
        for (start, end) in spans {
            if let Some(group) = group_start {
                let candidate = fence.render_span(group, end);
                let grown = self.buffer.len - self.last_segment_len() + char_len(&candidate);
                if grown <= self.config.chunk_size {
                    self.replace_last_segment(candidate);
                    self.add_symbols(&units, start, end);
                    continue;
                }
                self.flush();
            }

            self.place_fence_span(fence, &units, start, end);
            group_start = (!self.buffer.is_empty()).then_some(start);
        }
    }

    fn place_fence_span(
        &mut self,
        fence: &CodeFence,
        units: &[AtomicUnit],
        start: usize,
        end: usize,
    ) {
        let rendered = fence.render_span(start, end);
        let len = char_len(&rendered);
        self.make_room(len);

        if self.buffer.language.is_none() {
            self.buffer.language = fence.language.clone();
        }
        if !fence.closed {
            self.buffer.unterminated = true;
        }
        self.add_symbols(units, start, end);
        self.push(SegmentKind::Code, rendered);
        self.seal_if_oversized(len);
    }

    fn add_symbols(&mut self, units: &[AtomicUnit], start: usize, end: usize) {
        for unit in units.iter().filter(|u| u.intersects(start, end)) {
            self.buffer
                .functions
                .extend(unit.function_names().map(str::to_string));
            self.buffer
                .classes
                .extend(unit.class_names().map(str::to_string));
        }
    }

    fn last_segment_len(&self) -> usize {
        self.buffer
            .segments
            .last()
            .map_or(0, |(_, text)| char_len(text))
    }

    fn replace_last_segment(&mut self, text: String) {
        let old = self.last_segment_len();
        let new = char_len(&text);
        if let Some(last) = self.buffer.segments.last_mut() {
            last.1 = text;
            self.buffer.len = self.buffer.len - old + new;
        }
    }
}

/// Byte spans of each line of `text`, newline included
fn line_spans(text: &str) -> Vec<(usize, usize)> {
    let mut offset = 0;
    text.split_inclusive('\n')
        .map(|line| {
            let span = (offset, offset + line.len());
            offset += line.len();
            span
        })
        .collect()
}

/// Pack parsed blocks into chunks
#[must_use]
pub fn pack_blocks(blocks: &[Block], config: &ChunkerConfig) -> Vec<PackedChunk> {
    ChunkPacker::new(config).pack(blocks)
}
