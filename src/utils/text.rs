/// Morpheme boundary marker used throughout the grammar corpus.
pub const MARKER: char = '+';

// raw corpus text must never reach the index with markers in it
pub fn strip_markers(word: &str) -> String {
    word.chars().filter(|&c| c != MARKER).collect()
}

pub fn char_len(word: &str) -> usize {
    word.chars().count()
}
