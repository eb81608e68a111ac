//! Fixed-size document chunker.
//!
//! Splits document text into contiguous, non-overlapping parts of at most
//! `chunk_size` characters. Sizes count Unicode scalar values, so a part
//! never ends in the middle of a character. Concatenating the parts in order
//! gives back the input exactly; empty input yields no parts.

/// Default part size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 5000;

/// Split `text` into parts of at most `chunk_size` characters.
///
/// `chunk_size` must be greater than zero; configuration loading enforces this.
pub fn chunk_document(text: &str, chunk_size: usize) -> Vec<&str> {
    assert!(chunk_size > 0, "chunk_size must be > 0");

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == chunk_size {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        chunks.push(&text[start..]);
    }

    chunks
}

/// Episode name for the 1-based `part` of a document.
pub fn part_name(base: &str, part: usize) -> String {
    format!("{} - Part {}", base, part)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_no_chunks() {
        assert!(chunk_document("", 5000).is_empty());
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_document("Hello, world!", 5000);
        assert_eq!(chunks, vec!["Hello, world!"]);
    }

    #[test]
    fn test_exact_multiple() {
        let text = "abcdef";
        assert_eq!(chunk_document(text, 3), vec!["abc", "def"]);
        assert_eq!(chunk_document(text, 6), vec!["abcdef"]);
    }

    #[test]
    fn test_last_chunk_shorter() {
        assert_eq!(chunk_document("abcdefg", 3), vec!["abc", "def", "g"]);
    }

    #[test]
    fn test_twelve_thousand_chars_default_size() {
        let text = "x".repeat(12_000);
        let chunks = chunk_document(&text, DEFAULT_CHUNK_SIZE);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 5000);
        assert_eq!(chunks[1].len(), 5000);
        assert_eq!(chunks[2].len(), 2000);
    }

    #[test]
    fn test_counts_and_reconstruction() {
        let text: String = (0..1234).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        for size in [1, 2, 7, 100, 1233, 1234, 1235, 5000] {
            let chunks = chunk_document(&text, size);
            let expected = text.chars().count().div_ceil(size);
            assert_eq!(chunks.len(), expected, "size {}", size);
            assert!(chunks.iter().all(|c| !c.is_empty()));
            assert!(chunks.iter().all(|c| c.chars().count() <= size));
            assert_eq!(chunks.concat(), text, "size {}", size);
        }
    }

    #[test]
    fn test_multibyte_characters_are_never_split() {
        let text = "héllo wörld ✓✓✓";
        let chunks = chunk_document(text, 4);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert_eq!(chunks.concat(), text);
        assert_eq!(chunks[0], "héll");
    }

    #[test]
    fn test_part_name_is_one_based() {
        assert_eq!(part_name("Manual", 1), "Manual - Part 1");
        assert_eq!(part_name("Manual", 12), "Manual - Part 12");
    }
}
