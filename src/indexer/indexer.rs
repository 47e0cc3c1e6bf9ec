use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::{
    disk_index::disk_index_writer::stage_disk_table,
    errors::{LemmatizerError, Result},
    indexer::corpus::{MalformedCorpusRecord, Paradigm, read_document},
    utils::{
        lemma_data::LemmaData,
        paths::get_lemma_data_path,
        types::{BuildSummary, LemmaEntry, encode_entries},
    },
};

// Every form is mapped to the set of (lemma, pos) pairs it was seen with across the whole
// corpus. Nothing is classified until all documents have been read, so a form that first
// looks invariant can still turn out to be a homograph of another paradigm.
pub struct Indexer {
    form_lemmas: FxHashMap<String, BTreeSet<LemmaEntry>>,
    skipped: Vec<MalformedCorpusRecord>,
    no_of_documents: u32,
    no_of_paradigms: u32,
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Indexer {
    pub fn new() -> Self {
        Self {
            form_lemmas: FxHashMap::default(),
            skipped: Vec::new(),
            no_of_documents: 0,
            no_of_paradigms: 0,
        }
    }

    pub fn add_paradigm(&mut self, paradigm: &Paradigm) {
        self.no_of_paradigms += 1;
        for form in paradigm.forms() {
            self.form_lemmas
                .entry(form.text.clone())
                .or_default()
                .insert(LemmaEntry::new(paradigm.lemma.as_str(), form.pos.as_str()));
        }
    }

    pub fn add_skipped_record(&mut self, record: MalformedCorpusRecord) {
        warn!("skipping corpus record: {}", record);
        self.skipped.push(record);
    }

    // a malformed document fails the whole build, the caller discards this indexer
    pub fn add_document(&mut self, path: &Path) -> Result<()> {
        let document = read_document(path)?;
        debug!(
            "read {} paradigms from {}",
            document.paradigms.len(),
            path.display()
        );
        for paradigm in &document.paradigms {
            self.add_paradigm(paradigm);
        }
        for record in document.skipped {
            self.add_skipped_record(record);
        }
        self.no_of_documents += 1;
        Ok(())
    }

    pub fn process_directory(&mut self, dir_path: &Path) -> Result<u32> {
        let mut no_of_documents = 0;
        for path in collect_corpus_files(dir_path)? {
            info!("processing {}", path.display());
            self.add_document(&path)?;
            no_of_documents += 1;
        }
        Ok(no_of_documents)
    }

    pub fn skipped_records(&self) -> &[MalformedCorpusRecord] {
        &self.skipped
    }

    pub fn no_of_forms(&self) -> usize {
        self.form_lemmas.len()
    }

    /// Classifies every form and produces the serializable index.
    ///
    /// A form is invariant iff the only lemma it maps to is itself; its POS tags are
    /// dropped in that case. Every other form keeps its full sorted entry list.
    pub fn finish(self) -> (LemmaData, BuildSummary) {
        let mut data = LemmaData::new();
        let no_of_forms = self.form_lemmas.len() as u32;

        for (form, entries) in self.form_lemmas {
            if is_invariant(&form, &entries) {
                data.leave.insert(form);
            } else {
                let packed = encode_entries(&form, &entries);
                data.change.insert(form, packed);
            }
        }

        let summary = BuildSummary {
            no_of_documents: self.no_of_documents,
            no_of_paradigms: self.no_of_paradigms,
            no_of_forms,
            no_of_invariant: data.leave.len() as u32,
            no_of_changeable: data.change.len() as u32,
            no_of_skipped_records: self.skipped.len() as u32,
        };
        (data, summary)
    }
}

fn is_invariant(form: &str, entries: &BTreeSet<LemmaEntry>) -> bool {
    !entries.is_empty() && entries.iter().all(|entry| entry.lemma == form)
}

fn collect_corpus_files(dir_path: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir_path)? {
        let path = entry?.path();
        if path.is_dir() {
            files.extend(collect_corpus_files(&path)?);
        } else if path.extension().and_then(|s| s.to_str()) == Some("xml") {
            files.push(path);
        }
    }
    // directory order is platform dependent
    files.sort();
    Ok(files)
}

/// Reads every `*.xml` document under `corpus_dir` and writes both the JSON artifact
/// and the disk table into `data_dir`. Nothing is written if any document is malformed.
pub fn build_index(corpus_dir: &Path, data_dir: &Path, block_size: usize) -> Result<BuildSummary> {
    if !corpus_dir.is_dir() {
        return Err(LemmatizerError::data_unavailable(
            corpus_dir,
            "corpus directory does not exist",
        ));
    }

    let mut indexer = Indexer::new();
    let no_of_documents = indexer.process_directory(corpus_dir)?;
    if no_of_documents == 0 {
        return Err(LemmatizerError::data_unavailable(
            corpus_dir,
            "corpus directory contains no xml documents",
        ));
    }

    let (data, summary) = indexer.finish();
    info!(
        "found {} words to be left unchanged and {} changeable words",
        summary.no_of_invariant, summary.no_of_changeable
    );

    // both artifacts are complete on disk before either replaces the previous build. The
    // json goes in first: a table left older than it is derived again on open
    let lemma_data_path = get_lemma_data_path(data_dir);
    let staged_data = data.stage(&lemma_data_path)?;
    let staged_table = stage_disk_table(&data, data_dir, block_size)?;
    staged_data.persist(&lemma_data_path)?;
    staged_table.persist(data_dir)?;
    info!("index written to {}", data_dir.display());

    Ok(summary)
}
