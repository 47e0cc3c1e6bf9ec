use std::{
    collections::{BTreeMap, BTreeSet},
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::errors::{LemmatizerError, Result};

/// The serialized form-to-lemma index.
///
/// `change` maps a form to its packed `lemma|pos;...` entries, `leave` holds the
/// forms that are their own unique lemma. A form is never in both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LemmaData {
    pub change: BTreeMap<String, String>,
    pub leave: BTreeSet<String>,
}

impl LemmaData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.change.len() + self.leave.len()
    }

    pub fn is_empty(&self) -> bool {
        self.change.is_empty() && self.leave.is_empty()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            LemmatizerError::data_unavailable(path, format!("cannot open lemma data: {e}"))
        })?;
        let data: LemmaData = serde_json::from_reader(BufReader::new(file))?;
        if let Some(form) = data.change.keys().find(|form| data.leave.contains(*form)) {
            return Err(LemmatizerError::invalid_index(
                path,
                format!("form '{form}' is both invariant and changeable"),
            ));
        }
        Ok(data)
    }

    // written next to the target and persisted over it so readers never see a half file
    pub fn save(&self, path: &Path) -> Result<()> {
        self.stage(path)?.persist(path)?;
        Ok(())
    }

    /// Writes the artifact into a temporary next to `path` and leaves persisting it
    /// to the caller.
    pub fn stage(&self, path: &Path) -> Result<NamedTempFile> {
        let parent_dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent_dir)?;

        let temp_file = NamedTempFile::new_in(parent_dir)?;
        {
            let mut writer = BufWriter::new(temp_file.as_file());
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        Ok(temp_file)
    }
}
