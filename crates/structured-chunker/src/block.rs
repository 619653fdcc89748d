//! Markdown block parsing.
//!
//! A single forward line scan with two states: outside a fence every line is
//! classified as header, blank or paragraph text; inside a fence lines are
//! accumulated verbatim until a backtick run of the opening length closes it.

use once_cell::sync::Lazy;
use regex::Regex;

static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(#{1,6})[ \t]+(.*?\S)[ \t]*$").expect("valid header regex")
});

/// One typed block of a markdown document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// ATX header, `level` is the number of leading `#`
    Header { level: u8, text: String },
    /// Run of non-blank text lines
    Paragraph { text: String },
    /// Fenced code block
    CodeFence(CodeFence),
}

/// A fenced code block and enough of its delimiters to re-emit it verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFence {
    /// First word of the info string, lowercased
    pub language: Option<String>,
    /// Full info string after the opening backticks
    pub info: String,
    /// Length of the opening backtick run
    pub marker_len: usize,
    /// Body lines joined with `\n`, without the delimiter lines
    pub text: String,
    /// False when the document ended inside the fence
    pub closed: bool,
}

impl CodeFence {
    /// Opening delimiter line, e.g. "```python"
    #[must_use]
    pub fn opening_line(&self) -> String {
        let mut line = "`".repeat(self.marker_len);
        line.push_str(&self.info);
        line
    }

    /// Closing delimiter line, `None` for unterminated fences
    #[must_use]
    pub fn closing_line(&self) -> Option<String> {
        self.closed.then(|| "`".repeat(self.marker_len))
    }

    /// Render a slice of the body wrapped in this fence's delimiters.
    #[must_use]
    pub fn render_span(&self, start: usize, end: usize) -> String {
        let body = self.text[start..end].trim_end_matches('\n');
        let mut out = self.opening_line();
        out.push('\n');
        if !body.is_empty() {
            out.push_str(body);
            out.push('\n');
        }
        match self.closing_line() {
            Some(closing) => out.push_str(&closing),
            None => {
                // Keep the source verbatim: no synthesized closing delimiter.
                if out.ends_with('\n') {
                    out.pop();
                }
            }
        }
        out
    }

    /// Render the whole fence
    #[must_use]
    pub fn render(&self) -> String {
        self.render_span(0, self.text.len())
    }
}

impl Block {
    /// Markdown text of this block as it appears in a chunk
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Header { level, text } => {
                format!("{} {text}", "#".repeat(usize::from(*level)))
            }
            Self::Paragraph { text } => text.clone(),
            Self::CodeFence(fence) => fence.render(),
        }
    }
}

/// Opening fence marker: backtick run length and info string.
///
/// Tolerates up to three leading spaces. Info strings containing backticks
/// are not fences (they are inline code).
pub(crate) fn parse_fence_open(line: &str) -> Option<(usize, &str)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let run = rest.len() - rest.trim_start_matches('`').len();
    if run < 3 {
        return None;
    }
    let info = rest[run..].trim();
    if info.contains('`') {
        return None;
    }
    Some((run, info))
}

/// True when `line` closes a fence opened with `marker_len` backticks.
pub(crate) fn is_fence_close(line: &str, marker_len: usize) -> bool {
    let trimmed = line.trim();
    let indent = line.len() - line.trim_start_matches(' ').len();
    indent <= 3
        && trimmed.len() == marker_len
        && trimmed.bytes().all(|b| b == b'`')
}

/// Parse a header line into (level, title)
pub(crate) fn parse_header(line: &str) -> Option<(u8, String)> {
    let caps = HEADER_RE.captures(line)?;
    let level = u8::try_from(caps.get(1)?.as_str().len()).ok()?;
    Some((level, caps.get(2)?.as_str().to_string()))
}

enum State {
    Normal,
    InFence {
        marker_len: usize,
        info: String,
        lines: Vec<String>,
    },
}

/// Split raw document text into an ordered sequence of blocks.
#[must_use]
pub fn parse_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut state = State::Normal;

    for line in text.lines() {
        if let State::InFence {
            marker_len,
            info,
            lines,
        } = &mut state
        {
            if !is_fence_close(line, *marker_len) {
                lines.push(line.to_string());
                continue;
            }
            let fence = make_fence(*marker_len, std::mem::take(info), lines, true);
            blocks.push(Block::CodeFence(fence));
            state = State::Normal;
            continue;
        }

        if let Some((marker_len, info)) = parse_fence_open(line) {
            flush_paragraph(&mut paragraph, &mut blocks);
            state = State::InFence {
                marker_len,
                info: info.to_string(),
                lines: Vec::new(),
            };
        } else if let Some((level, title)) = parse_header(line) {
            flush_paragraph(&mut paragraph, &mut blocks);
            blocks.push(Block::Header { level, text: title });
        } else if line.trim().is_empty() {
            flush_paragraph(&mut paragraph, &mut blocks);
        } else {
            paragraph.push(line.trim_end());
        }
    }

    flush_paragraph(&mut paragraph, &mut blocks);
    if let State::InFence {
        marker_len,
        info,
        lines,
    } = state
    {
        log::warn!(
            "document ended inside a ```{info} fence ({} lines), keeping it as one unterminated block",
            lines.len()
        );
        blocks.push(Block::CodeFence(make_fence(marker_len, info, &lines, false)));
    }

    log::debug!("parsed {} blocks", blocks.len());
    blocks
}

fn flush_paragraph(paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>) {
    if paragraph.is_empty() {
        return;
    }
    blocks.push(Block::Paragraph {
        text: paragraph.join("\n"),
    });
    paragraph.clear();
}

fn make_fence(marker_len: usize, info: String, lines: &[String], closed: bool) -> CodeFence {
    let language = info
        .split_whitespace()
        .next()
        .map(str::to_lowercase);
    CodeFence {
        language,
        info,
        marker_len,
        text: lines.join("\n"),
        closed,
    }
}
