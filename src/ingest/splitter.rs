use unicode_segmentation::UnicodeSegmentation as _;

use crate::error::{Error, Result};

/// A contiguous span of a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    /// Offset of the first character, counted in chars.
    pub char_offset: usize,
    pub char_len: usize,
}

#[derive(Clone, Copy, Debug)]
struct Piece {
    byte_start: usize,
    byte_end: usize,
    char_len: usize,
}

/// Splits text into overlapping spans of at most `chunk_size` characters.
///
/// Boundaries fall between Unicode words where possible. A word longer than `chunk_size`
/// is cut on char boundaries. Consecutive spans share at most `chunk_overlap` characters
/// and never leave a gap, so every character of the input lands in some span.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidArgument("chunk_size must be positive".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::InvalidArgument(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    fn pieces(&self, text: &str) -> Vec<Piece> {
        let mut pieces = Vec::new();
        for (byte_start, word) in text.split_word_bound_indices() {
            let char_len = word.chars().count();
            if char_len <= self.chunk_size {
                pieces.push(Piece {
                    byte_start,
                    byte_end: byte_start + word.len(),
                    char_len,
                });
                continue;
            }

            let mut start = byte_start;
            let mut count = 0;
            for (i, _) in word.char_indices() {
                if count == self.chunk_size {
                    pieces.push(Piece {
                        byte_start: start,
                        byte_end: byte_start + i,
                        char_len: count,
                    });
                    start = byte_start + i;
                    count = 0;
                }
                count += 1;
            }
            pieces.push(Piece {
                byte_start: start,
                byte_end: byte_start + word.len(),
                char_len: count,
            });
        }
        pieces
    }

    pub fn split(&self, text: &str) -> Vec<TextSpan> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let pieces = self.pieces(text);
        // char offset of each piece
        let mut offsets = Vec::with_capacity(pieces.len());
        let mut acc = 0;
        for piece in &pieces {
            offsets.push(acc);
            acc += piece.char_len;
        }

        let mut spans = Vec::new();
        let mut start = 0;
        while start < pieces.len() {
            let mut end = start;
            let mut len = 0;
            while end < pieces.len() && len + pieces[end].char_len <= self.chunk_size {
                len += pieces[end].char_len;
                end += 1;
            }

            spans.push(TextSpan {
                text: text[pieces[start].byte_start..pieces[end - 1].byte_end].to_owned(),
                char_offset: offsets[start],
                char_len: len,
            });
            if end == pieces.len() {
                break;
            }

            // Walk back from `end` while the shared tail stays within the overlap budget
            // and still leaves room for the next unseen piece.
            let next_len = pieces[end].char_len;
            let mut next = end;
            let mut overlap = 0;
            while next - 1 > start {
                let candidate = overlap + pieces[next - 1].char_len;
                if candidate > self.chunk_overlap || candidate + next_len > self.chunk_size {
                    break;
                }
                overlap = candidate;
                next -= 1;
            }
            start = next;
        }
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_invariants(splitter: &TextSplitter, text: &str, spans: &[TextSpan]) {
        let total = text.chars().count();
        assert!(!spans.is_empty());
        assert_eq!(spans[0].char_offset, 0);
        let last = spans.last().unwrap();
        assert_eq!(last.char_offset + last.char_len, total);

        let chars: Vec<char> = text.chars().collect();
        for span in spans {
            assert!(span.char_len > 0);
            assert!(span.char_len <= splitter.chunk_size());
            assert_eq!(span.text.chars().count(), span.char_len);
            let expected: String = chars[span.char_offset..span.char_offset + span.char_len]
                .iter()
                .collect();
            assert_eq!(span.text, expected);
        }
        for pair in spans.windows(2) {
            let prev_end = pair[0].char_offset + pair[0].char_len;
            assert!(pair[1].char_offset <= prev_end, "gap between spans");
            assert!(pair[1].char_offset > pair[0].char_offset, "no progress");
            assert!(prev_end - pair[1].char_offset <= splitter.chunk_overlap());
        }
    }

    #[yare::parameterized(
        short = { 1024, 200, "Error 429 means rate limiting; retry after 60 seconds." },
        tight = { 16, 4, "Error 429 means rate limiting; retry after 60 seconds." },
        no_overlap = { 10, 0, "one two three four five six seven eight nine ten" },
        long_word = { 8, 3, "a supercalifragilisticexpialidocious word" },
        cyrillic = { 12, 5, "Ошибка 429 означает ограничение частоты запросов." },
        newlines = { 20, 6, "line one\n\nline two\r\n  indented line three\n" },
    )]
    fn spans_cover_the_document(chunk_size: usize, chunk_overlap: usize, text: &str) {
        let splitter = TextSplitter::new(chunk_size, chunk_overlap).unwrap();
        let spans = splitter.split(text);
        check_invariants(&splitter, text, &spans);
    }

    #[test]
    fn short_document_is_one_span() {
        let splitter = TextSplitter::new(1024, 200).unwrap();
        let text = "Error 429 means rate limiting; retry after 60 seconds.";
        assert_eq!(
            splitter.split(text),
            vec![TextSpan {
                text: text.to_owned(),
                char_offset: 0,
                char_len: text.chars().count(),
            }]
        );
    }

    #[test]
    fn consecutive_spans_overlap() {
        let splitter = TextSplitter::new(20, 8).unwrap();
        let spans = splitter.split("alpha beta gamma delta epsilon zeta eta theta iota kappa");
        assert!(spans.len() > 2);
        assert!(
            spans
                .windows(2)
                .any(|w| w[1].char_offset < w[0].char_offset + w[0].char_len)
        );
    }

    #[test]
    fn whitespace_only_yields_nothing() {
        let splitter = TextSplitter::new(10, 2).unwrap();
        assert!(splitter.split("").is_empty());
        assert!(splitter.split(" \n\t ").is_empty());
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(
            TextSplitter::new(0, 0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            TextSplitter::new(10, 10),
            Err(Error::InvalidArgument(_))
        ));
    }
}
