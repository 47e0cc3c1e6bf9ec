use crate::utils::types::LemmaEntry;

/// What the index knows about a single (marker-free) form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormLookup {
    /// The form is its own unique lemma.
    Invariant,
    /// Candidate entries, lemma text may be empty meaning "same as the form".
    Changeable(Vec<LemmaEntry>),
    Unknown,
}

/// Point lookups into a built index. Implementations are read-only after construction.
pub trait LemmaStore {
    fn lookup(&self, form: &str) -> FormLookup;

    fn no_of_invariant(&self) -> usize;

    fn no_of_changeable(&self) -> usize;
}
