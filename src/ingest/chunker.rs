/// Splits free text into overlapping character windows, trimming each
/// window back to the last sentence boundary when one exists near the end.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap: overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let step = (self.chunk_size - self.overlap).max(1);
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            let window: String = chars[start..end].iter().collect();

            let piece = if end < chars.len() {
                trim_to_sentence_boundary(&window)
            } else {
                window
            };

            let piece = piece.trim();
            if !piece.is_empty() {
                chunks.push(piece.to_string());
            }

            start += step;
        }

        chunks
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(500, 50)
    }
}

/// Cuts the window at the last sentence ending in its final fifth, when
/// there is one. Operates on char indices so multi-byte text is safe.
fn trim_to_sentence_boundary(window: &str) -> String {
    let chars: Vec<char> = window.chars().collect();
    let search_start = chars.len() * 4 / 5;

    let mut cut = None;
    for i in (search_start..chars.len().saturating_sub(1)).rev() {
        if matches!(chars[i], '.' | '!' | '?') && chars[i + 1].is_whitespace() {
            cut = Some(i + 1);
            break;
        }
    }

    match cut {
        Some(end) => chars[..end].iter().collect(),
        None => window.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunker = TextChunker::new(100, 10);
        let chunks = chunker.split("A single short sentence.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "A single short sentence.");
    }

    #[test]
    fn long_text_overlaps() {
        let chunker = TextChunker::new(50, 10);
        let text = "This is a test sentence. ".repeat(10);
        let chunks = chunker.split(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50);
        }
    }

    #[test]
    fn empty_text_yields_nothing() {
        let chunker = TextChunker::default();
        assert!(chunker.split("").is_empty());
        assert!(chunker.split("   \n  ").is_empty());
    }

    #[test]
    fn boundary_trim_prefers_sentence_end() {
        let window = "First sentence here padding padding. Trailing fragment";
        let trimmed = trim_to_sentence_boundary(window);
        // no boundary in the final fifth of this window, so it stays whole
        assert_eq!(trimmed, window);

        let window = "padding padding padding padding padding ends. tail";
        let trimmed = trim_to_sentence_boundary(window);
        assert!(trimmed.ends_with("ends."));
    }

    #[test]
    fn multibyte_text_does_not_panic() {
        let chunker = TextChunker::new(20, 5);
        let text = "금융 상품 설명서. ".repeat(20);
        let chunks = chunker.split(&text);
        assert!(!chunks.is_empty());
    }
}
