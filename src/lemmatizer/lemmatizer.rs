use std::{collections::BTreeSet, path::Path};

use tracing::info;

use crate::{
    config::{Config, StorageMode},
    disk_index::{DEFAULT_BLOCK_SIZE, disk_index::DiskIndex},
    errors::Result,
    in_memory_index::in_memory_index::InMemoryIndex,
    indexer::indexer::build_index,
    lemmatizer::store::{FormLookup, LemmaStore},
    utils::{
        lemma_data::LemmaData,
        paths::has_lemma_data,
        text::{char_len, strip_markers},
    },
};

// The storage strategy is picked once at construction
pub enum LemmaStorage {
    Memory(InMemoryIndex),
    Disk(DiskIndex),
}

impl LemmaStorage {
    pub fn open(data_dir: &Path, mode: StorageMode) -> Result<Self> {
        match mode {
            StorageMode::Memory => Ok(LemmaStorage::Memory(InMemoryIndex::load(data_dir)?)),
            StorageMode::Disk => Ok(LemmaStorage::Disk(DiskIndex::open(data_dir)?)),
        }
    }

    pub fn mode(&self) -> StorageMode {
        match self {
            LemmaStorage::Memory(_) => StorageMode::Memory,
            LemmaStorage::Disk(_) => StorageMode::Disk,
        }
    }
}

impl LemmaStore for LemmaStorage {
    fn lookup(&self, form: &str) -> FormLookup {
        match self {
            LemmaStorage::Memory(index) => index.lookup(form),
            LemmaStorage::Disk(index) => index.lookup(form),
        }
    }

    fn no_of_invariant(&self) -> usize {
        match self {
            LemmaStorage::Memory(index) => index.no_of_invariant(),
            LemmaStorage::Disk(index) => index.no_of_invariant(),
        }
    }

    fn no_of_changeable(&self) -> usize {
        match self {
            LemmaStorage::Memory(index) => index.no_of_changeable(),
            LemmaStorage::Disk(index) => index.no_of_changeable(),
        }
    }
}

/// Maps Belarusian word forms to their lemmas.
///
/// Lookups never fail: a word the index does not know is returned as its own lemma.
/// The index is immutable once loaded, so a `Lemmatizer` can be shared between
/// threads behind an `Arc`.
pub struct Lemmatizer {
    storage: LemmaStorage,
}

impl Lemmatizer {
    /// Resolves the data directory from `config`, makes sure an index is there and
    /// opens it in the configured storage mode. A missing index is fetched from
    /// `index_url` when one is configured, otherwise built from the corpus.
    pub fn new(config: &Config) -> Result<Self> {
        let mode = config.storage_mode()?;
        let data_dir = config.data_dir();
        ensure_lemma_data(&data_dir, config)?;
        Self::open(&data_dir, mode)
    }

    /// Opens an index already present in `data_dir`, nothing is fetched.
    pub fn open(data_dir: &Path, mode: StorageMode) -> Result<Self> {
        info!("opening lemma index in {} ({} mode)", data_dir.display(), mode);
        Ok(Self {
            storage: LemmaStorage::open(data_dir, mode)?,
        })
    }

    pub fn from_data(data: LemmaData) -> Self {
        Self {
            storage: LemmaStorage::Memory(InMemoryIndex::from_data(data)),
        }
    }

    pub fn mode(&self) -> StorageMode {
        self.storage.mode()
    }

    pub fn storage(&self) -> &LemmaStorage {
        &self.storage
    }

    /// All candidate lemmas of `word`, sorted and deduplicated.
    ///
    /// Invariant and unknown words yield the word itself whatever `pos` is. For a
    /// changeable word `pos` keeps only the entries tagged with it (case-insensitive),
    /// which may leave nothing. An empty `pos` filters nothing.
    pub fn lemmas(&self, word: &str, pos: Option<&str>) -> Vec<String> {
        let form = strip_markers(word);
        let entries = match self.storage.lookup(&form) {
            FormLookup::Invariant | FormLookup::Unknown => return vec![form],
            FormLookup::Changeable(entries) => entries,
        };

        let pos = pos.map(str::trim).filter(|pos| !pos.is_empty());
        let lemmas: BTreeSet<&str> = entries
            .iter()
            .filter(|entry| pos.is_none_or(|pos| entry.matches_pos(pos)))
            .map(|entry| entry.lemma_for(&form))
            .collect();
        lemmas.into_iter().map(str::to_string).collect()
    }

    /// The shortest candidate lemma of `word`, ties going to the lexicographically
    /// smallest. When the POS filter leaves no candidate the word itself is returned,
    /// with markers stripped just like every other result.
    pub fn lemmatize(&self, word: &str, pos: Option<&str>) -> String {
        self.lemmas(word, pos)
            .into_iter()
            .min_by(|a, b| char_len(a).cmp(&char_len(b)).then_with(|| a.cmp(b)))
            .unwrap_or_else(|| strip_markers(word))
    }

    pub fn no_of_invariant(&self) -> usize {
        self.storage.no_of_invariant()
    }

    pub fn no_of_changeable(&self) -> usize {
        self.storage.no_of_changeable()
    }
}

// A prebuilt index is fetched when one is configured. Otherwise, or when the archive
// turns out to hold no usable index, the index is built from the corpus.
fn ensure_lemma_data(data_dir: &Path, config: &Config) -> Result<()> {
    if has_lemma_data(data_dir) {
        return Ok(());
    }

    #[cfg(feature = "download")]
    if let Some(url) = config.index_url.as_deref() {
        match crate::fetch::ensure_lemma_data(data_dir, url) {
            Ok(()) => return Ok(()),
            Err(e) => tracing::warn!("no prebuilt index available: {}", e),
        }
    }

    #[cfg(feature = "download")]
    crate::fetch::ensure_corpus(&config.corpus_dir, &config.corpus_url)?;

    info!(
        "building lemma index from {} into {}",
        config.corpus_dir.display(),
        data_dir.display()
    );
    build_index(&config.corpus_dir, data_dir, DEFAULT_BLOCK_SIZE)?;
    Ok(())
}
