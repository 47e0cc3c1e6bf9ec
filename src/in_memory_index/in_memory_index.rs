use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::info;

use crate::{
    errors::Result,
    lemmatizer::store::{FormLookup, LemmaStore},
    utils::{lemma_data::LemmaData, paths::get_lemma_data_path, types::decode_entries},
};

// The whole artifact held in process memory. Packed entries are kept as stored and
// decoded per lookup, which keeps the resident size close to the json file.
pub struct InMemoryIndex {
    changeable: FxHashMap<String, String>,
    invariant: FxHashSet<String>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            changeable: FxHashMap::default(),
            invariant: FxHashSet::default(),
        }
    }

    pub fn from_data(data: LemmaData) -> Self {
        let mut index = Self {
            changeable: FxHashMap::with_capacity_and_hasher(data.change.len(), Default::default()),
            invariant: FxHashSet::with_capacity_and_hasher(data.leave.len(), Default::default()),
        };
        index.changeable.extend(data.change);
        index.invariant.extend(data.leave);
        index
    }

    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = get_lemma_data_path(data_dir);
        let data = LemmaData::load(&path)?;
        let index = Self::from_data(data);
        info!(
            "loaded {} invariant and {} changeable forms from {}",
            index.invariant.len(),
            index.changeable.len(),
            path.display()
        );
        Ok(index)
    }

    pub fn is_invariant(&self, form: &str) -> bool {
        self.invariant.contains(form)
    }

    pub fn get_packed_entries(&self, form: &str) -> Option<&str> {
        self.changeable.get(form).map(String::as_str)
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl LemmaStore for InMemoryIndex {
    fn lookup(&self, form: &str) -> FormLookup {
        if self.is_invariant(form) {
            return FormLookup::Invariant;
        }
        match self.get_packed_entries(form) {
            Some(packed) => FormLookup::Changeable(decode_entries(packed)),
            None => FormLookup::Unknown,
        }
    }

    fn no_of_invariant(&self) -> usize {
        self.invariant.len()
    }

    fn no_of_changeable(&self) -> usize {
        self.changeable.len()
    }
}
