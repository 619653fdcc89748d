//! Character counting and split-point helpers shared by packing and overlap.

use unicode_segmentation::UnicodeSegmentation;

/// Length in characters (Unicode scalar values)
#[inline]
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of the `n`-th character, or `text.len()` past the end
pub(crate) fn byte_offset(text: &str, n: usize) -> usize {
    text.char_indices().nth(n).map_or(text.len(), |(idx, _)| idx)
}

/// Byte spans of inline code (`` `...` ``, matched by equal backtick runs)
pub(crate) fn inline_code_spans(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let run_at = |i: usize| bytes[i..].iter().take_while(|&&b| b == b'`').count();

    let mut spans = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let open = run_at(i);
        let mut j = i + open;
        let mut close = None;
        while j < bytes.len() {
            if bytes[j] == b'`' {
                let run = run_at(j);
                if run == open {
                    close = Some(j + run);
                    break;
                }
                j += run;
            } else {
                j += 1;
            }
        }
        match close {
            Some(end) => {
                spans.push((i, end));
                i = end;
            }
            None => i += open,
        }
    }
    spans
}

fn outside(spans: &[(usize, usize)], point: usize) -> bool {
    let next = spans.partition_point(|&(_, end)| end <= point);
    spans.get(next).map_or(true, |&(start, _)| point <= start)
}

fn at_whitespace(text: &str, point: usize) -> bool {
    text[..point].ends_with(char::is_whitespace) || text[point..].starts_with(char::is_whitespace)
}

/// Sentence boundaries (byte offsets, exclusive of 0 and `len`) that do not
/// fall inside inline code. Line breaks and blank lines count as boundaries.
pub(crate) fn sentence_points(text: &str) -> Vec<usize> {
    let spans = inline_code_spans(text);
    text.split_sentence_bound_indices()
        .map(|(idx, _)| idx)
        .filter(|&idx| idx > 0 && idx < text.len() && outside(&spans, idx))
        .collect()
}

/// Whitespace word boundaries (byte offsets, exclusive of 0 and `len`)
/// outside inline code
pub(crate) fn word_points(text: &str) -> Vec<usize> {
    let spans = inline_code_spans(text);
    text.split_word_bound_indices()
        .map(|(idx, _)| idx)
        .filter(|&idx| {
            idx > 0 && idx < text.len() && at_whitespace(text, idx) && outside(&spans, idx)
        })
        .collect()
}

/// Characters segmented past the budget, so boundaries at the limit (and
/// the whitespace before them) resolve as they would on the full text.
const LOOKAHEAD_CHARS: usize = 64;

/// Cuts one paragraph into budget-sized pieces.
///
/// Inline code is located once; each cut only segments the budget window,
/// so splitting a paragraph is linear in its length.
pub(crate) struct Splitter<'a> {
    text: &'a str,
    code: Vec<(usize, usize)>,
}

impl<'a> Splitter<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            text,
            code: inline_code_spans(text),
        }
    }

    pub(crate) const fn text(&self) -> &'a str {
        self.text
    }

    /// Where to cut `text[from..]` so the trimmed head fits `limit` characters.
    ///
    /// Returns an absolute byte offset. Sentence boundaries win, whitespace
    /// boundaries come next, and with `allow_char_cut` a raw cut at `limit`
    /// is the last resort.
    pub(crate) fn cut(&self, from: usize, limit: usize, allow_char_cut: bool) -> Option<usize> {
        if limit == 0 {
            return None;
        }
        let rest = &self.text[from..];
        let window = &rest[..byte_offset(rest, limit + LOOKAHEAD_CHARS)];

        let sentences = window.split_sentence_bound_indices().map(|(idx, _)| idx);
        if let Some(p) = self.best_fit(from, window, sentences, limit) {
            return Some(from + p);
        }
        let words = window
            .split_word_bound_indices()
            .map(|(idx, _)| idx)
            .filter(|&idx| idx > 0 && at_whitespace(window, idx));
        if let Some(p) = self.best_fit(from, window, words, limit) {
            return Some(from + p);
        }
        allow_char_cut.then(|| from + byte_offset(rest, limit))
    }

    /// Last point whose trimmed prefix fits `limit`, counting characters as
    /// the points advance.
    fn best_fit(
        &self,
        from: usize,
        window: &str,
        points: impl Iterator<Item = usize>,
        limit: usize,
    ) -> Option<usize> {
        let mut best = None;
        let mut counted = 0;
        let mut chars = 0;
        for point in points.filter(|&p| p > 0) {
            chars += char_len(&window[counted..point]);
            counted = point;

            let head = window[..point].trim_end();
            let head_chars = chars - char_len(&window[head.len()..point]);
            if head_chars > limit {
                break;
            }
            if !head.is_empty() && outside(&self.code, from + point) {
                best = Some(point);
            }
        }
        best
    }
}

/// True when `text` has at most `limit` characters, without counting past it
pub(crate) fn fits(text: &str, limit: usize) -> bool {
    text.chars().nth(limit).is_none()
}

/// Start offset of the last `max_chars` characters of `text`, moved forward
/// to the first sentence (or, failing that, word) boundary inside the window.
pub(crate) fn tail_start(text: &str, max_chars: usize) -> usize {
    let total = char_len(text);
    if total <= max_chars {
        return 0;
    }
    let window = byte_offset(text, total - max_chars);
    sentence_points(text)
        .into_iter()
        .find(|&p| p >= window)
        .or_else(|| word_points(text).into_iter().find(|&p| p >= window))
        .unwrap_or(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_char_len_counts_scalars() {
        assert_eq!(char_len("héllo"), 5);
        assert_eq!(byte_offset("héllo", 2), 3);
        assert_eq!(byte_offset("abc", 10), 3);
    }

    #[test]
    fn test_inline_code_spans() {
        let text = "use `a. b` and ``x ` y`` then `open";
        let spans = inline_code_spans(text);
        assert_eq!(spans.len(), 2);
        assert_eq!(&text[spans[0].0..spans[0].1], "`a. b`");
        assert_eq!(&text[spans[1].0..spans[1].1], "``x ` y``");
    }

    #[test]
    fn sentence_points_skip_inline_code() {
        let text = "Call `obj.run(). Then` now. Next sentence.";
        let points = sentence_points(text);
        assert!(points.iter().all(|&p| !(6..22).contains(&p)));
        assert!(points.contains(&text.find("Next").unwrap()));
    }

    #[test]
    fn cut_prefers_sentences() {
        let splitter = Splitter::new("One two. Three four five six.");
        let cut = splitter.cut(0, 12, false).unwrap();
        assert_eq!(splitter.text()[..cut].trim_end(), "One two.");
    }

    #[test]
    fn cut_falls_back_to_whitespace_then_chars() {
        let splitter = Splitter::new("alpha beta gamma. delta");
        let cut = splitter.cut(0, 12, false).unwrap();
        assert_eq!(splitter.text()[..cut].trim_end(), "alpha beta");

        let blob = "x".repeat(30);
        let splitter = Splitter::new(&blob);
        assert_eq!(splitter.cut(0, 10, false), None);
        assert_eq!(splitter.cut(0, 10, true), Some(10));
    }

    #[test]
    fn cut_is_relative_to_offset_and_skips_inline_code() {
        let text = "Lead in. Run `a. b c` first. Then rest.";
        let splitter = Splitter::new(text);
        let from = text.find("Run").unwrap();
        let cut = splitter.cut(from, 10, false).unwrap();
        // Spaces inside the inline code are not cut points.
        assert_eq!(text[from..cut].trim_end(), "Run");
    }

    #[test]
    fn cut_only_segments_the_window() {
        let text = "Short sentence here. ".repeat(20_000);
        let splitter = Splitter::new(&text);
        let cut = splitter.cut(0, 100, false).unwrap();
        assert!(char_len(text[..cut].trim_end()) <= 100);
        assert!(cut >= 80);
    }

    #[test]
    fn test_fits() {
        assert!(fits("abc", 3));
        assert!(!fits("abcd", 3));
        assert!(fits("", 0));
    }

    #[test]
    fn tail_starts_at_sentence() {
        let text = "First sentence here. Second one. Third.";
        let start = tail_start(text, 20);
        assert_eq!(&text[start..], "Second one. Third.");
        assert_eq!(tail_start("short", 20), 0);
    }
}
