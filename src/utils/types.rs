use std::fmt;

pub const ENTRY_SEPARATOR: char = ';';
pub const FIELD_SEPARATOR: char = '|';

/// One candidate `(lemma, pos)` pair of a changeable form.
///
/// An empty `lemma` means "same as the looked up form", the builder writes it that
/// way whenever the lemma equals the form so only the POS has to be stored.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LemmaEntry {
    pub lemma: String,
    pub pos: String,
}

impl LemmaEntry {
    pub fn new<L: Into<String>, P: Into<String>>(lemma: L, pos: P) -> Self {
        Self {
            lemma: lemma.into(),
            pos: pos.into(),
        }
    }

    // resolves the empty lemma convention against the queried form
    pub fn lemma_for<'a>(&'a self, form: &'a str) -> &'a str {
        if self.lemma.is_empty() {
            form
        } else {
            &self.lemma
        }
    }

    // compared char by char, nothing is allocated per candidate
    pub fn matches_pos(&self, pos: &str) -> bool {
        self.pos
            .chars()
            .flat_map(char::to_lowercase)
            .eq(pos.chars().flat_map(char::to_lowercase))
    }
}

impl fmt::Display for LemmaEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.lemma, FIELD_SEPARATOR, self.pos)
    }
}

// Entries are written in the order given; the builder hands them over sorted.
// A lemma equal to the form is written as empty text.
pub fn encode_entries<'a, I>(form: &str, entries: I) -> String
where
    I: IntoIterator<Item = &'a LemmaEntry>,
{
    let mut packed = String::new();
    for (i, entry) in entries.into_iter().enumerate() {
        if i > 0 {
            packed.push(ENTRY_SEPARATOR);
        }
        if entry.lemma != form {
            packed.push_str(&entry.lemma);
        }
        packed.push(FIELD_SEPARATOR);
        packed.push_str(&entry.pos);
    }
    packed
}

// An entry without a field separator is read as a bare lemma with no POS.
pub fn decode_entries(packed: &str) -> Vec<LemmaEntry> {
    packed
        .split(ENTRY_SEPARATOR)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(FIELD_SEPARATOR) {
            Some((lemma, pos)) => LemmaEntry::new(lemma, pos),
            None => LemmaEntry::new(entry, ""),
        })
        .collect()
}

/// Counts reported after an index build.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub no_of_documents: u32,
    pub no_of_paradigms: u32,
    pub no_of_forms: u32,
    pub no_of_invariant: u32,
    pub no_of_changeable: u32,
    pub no_of_skipped_records: u32,
}
