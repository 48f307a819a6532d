//! Recursive text segmentation for corpus ingestion.
//!
//! Splits text on progressively finer separators (paragraph, line, sentence
//! punctuation) until every chunk fits the size budget, falling back to a
//! forced character window with overlap. All budgets are in characters so
//! multi-byte text is handled safely.

/// Separators tried in order, coarsest first.
const SEPARATORS: &[&str] = &[
    "\n\n", "\n", "。", "！", "？", "；", ". ", "! ", "? ", "; ", "，", ", ",
];

/// Pure recursive text splitter.
pub struct TextSegmenter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSegmenter {
    /// `chunk_size` and `chunk_overlap` are character counts. Overlap must
    /// be smaller than size; callers validate via config.
    #[must_use]
    pub const fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Split `text` into chunks of at most `chunk_size` characters.
    ///
    /// Whitespace-only input yields no chunks. Adjacent undersized pieces
    /// are merged back together while they still fit the budget.
    #[must_use]
    pub fn segment(&self, text: &str) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        let pieces = self.split_recursive(trimmed, 0);
        self.merge_small(pieces)
    }

    fn split_recursive(&self, text: &str, separator_index: usize) -> Vec<String> {
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }
        let Some(separator) = SEPARATORS.get(separator_index) else {
            return self.window_split(text);
        };

        if !text.contains(separator) {
            return self.split_recursive(text, separator_index + 1);
        }

        let mut out = Vec::new();
        for part in split_keep_separator(text, separator) {
            if part.trim().is_empty() {
                continue;
            }
            if char_len(&part) <= self.chunk_size {
                out.push(part);
            } else {
                out.extend(self.split_recursive(&part, separator_index + 1));
            }
        }
        out
    }

    /// Forced character window with overlap, used when no separator helps.
    fn window_split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);
        let mut out = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            out.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        out
    }

    /// Merge adjacent pieces while the combination still fits the budget.
    fn merge_small(&self, pieces: Vec<String>) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for piece in pieces {
            let piece = piece.trim().to_string();
            if piece.is_empty() {
                continue;
            }
            match out.last_mut() {
                Some(last) if char_len(last) + char_len(&piece) <= self.chunk_size => {
                    last.push_str(&piece);
                }
                _ => out.push(piece),
            }
        }
        out
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split on `separator`, keeping the separator attached to the preceding
/// piece so sentence punctuation survives segmentation.
fn split_keep_separator(text: &str, separator: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find(separator) {
        let end = pos + separator.len();
        out.push(rest[..end].to_string());
        rest = &rest[end..];
    }
    if !rest.is_empty() {
        out.push(rest.to_string());
    }
    out
}
