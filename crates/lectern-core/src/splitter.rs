//! Character-window text splitter with overlap.

use crate::config::SplitterConfig;

/// A piece of a document, ready to embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the chunk in the document.
    pub index: usize,
    pub text: String,
}

/// Splits text into overlapping windows, preferring paragraph, line and
/// sentence boundaries near the end of each window.
#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// Create a splitter. The overlap is clamped below the chunk size.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size / 2),
        }
    }

    pub fn from_config(config: &SplitterConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total {
            let target_end = (start + self.chunk_size).min(total);
            let end = find_break_point(&chars, start, target_end, total);

            let piece: String = chars[start..end].iter().collect();
            let piece = piece.trim();
            if !piece.is_empty() {
                chunks.push(Chunk {
                    index: chunks.len(),
                    text: piece.to_string(),
                });
            }

            if end >= total {
                break;
            }
            start = end.saturating_sub(self.chunk_overlap).max(start + 1);
        }

        chunks
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::from_config(&SplitterConfig::default())
    }
}

/// Find a break point in the last fifth of the window, never past it.
fn find_break_point(chars: &[char], start: usize, target_end: usize, total: usize) -> usize {
    if target_end >= total {
        return total;
    }

    let search_start = target_end - (target_end - start) / 5;

    // Paragraph break
    for i in (search_start..target_end).rev() {
        if i + 1 < target_end && chars[i] == '\n' && chars[i + 1] == '\n' {
            return i + 2;
        }
    }

    // Line break
    for i in (search_start..target_end).rev() {
        if chars[i] == '\n' {
            return i + 1;
        }
    }

    // Sentence end, including full-width stops
    for i in (search_start..target_end).rev() {
        match chars[i] {
            '。' | '！' | '？' => return i + 1,
            '.' | '!' | '?' if i + 1 < total && chars[i + 1].is_whitespace() => return i + 1,
            _ => {}
        }
    }

    target_end
}
