use std::{
    fs::{self, File},
    io::{self, BufReader, Read},
    path::{Path, PathBuf},
};

use tracing::{info, warn};

use crate::{
    disk_index::{
        DEFAULT_BLOCK_SIZE,
        block::{Block, DiskRecord},
        block_directory::{BlockDirectory, BlockPointer, TABLE_MAGIC},
        disk_index_writer::write_disk_table,
    },
    errors::{LemmatizerError, Result},
    lemmatizer::store::{FormLookup, LemmaStore},
    utils::{
        lemma_data::LemmaData,
        paths::{get_disk_table_metadata_path, get_disk_table_path, get_lemma_data_path},
        types::decode_entries,
    },
};

// Only the block directory lives in memory. Each lookup reads one block of the table
// at its offset, inflates it and binary searches the forms inside. Reads are
// positional, so concurrent lookups share the file without a lock.
pub struct DiskIndex {
    directory: BlockDirectory,
    table: File,
    table_path: PathBuf,
}

impl DiskIndex {
    /// Opens the disk table in `data_dir`, deriving it from `lemma_data.json` first when
    /// only the json artifact is present or the table is older than it.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let table_path = get_disk_table_path(data_dir);
        let metadata_path = get_disk_table_metadata_path(data_dir);
        let lemma_data_path = get_lemma_data_path(data_dir);

        if !table_path.exists() || !metadata_path.exists() {
            if !lemma_data_path.exists() {
                return Err(LemmatizerError::data_unavailable(
                    data_dir,
                    "neither a disk table nor lemma_data.json is present",
                ));
            }
            info!("deriving disk table from {}", lemma_data_path.display());
            derive_table(data_dir)?;
        } else if is_older(&table_path, &lemma_data_path) {
            warn!(
                "disk table is older than {}, deriving it again",
                lemma_data_path.display()
            );
            if let Err(e) = derive_table(data_dir) {
                warn!("keeping the existing disk table: {}", e);
            }
        }

        let metadata_file = File::open(&metadata_path)?;
        let directory = BlockDirectory::load(BufReader::new(metadata_file))
            .map_err(|e| LemmatizerError::invalid_index(&metadata_path, e.to_string()))?;

        let mut table = File::open(&table_path)?;
        let mut magic = vec![0u8; TABLE_MAGIC.len()];
        table
            .read_exact(&mut magic)
            .map_err(|e| LemmatizerError::invalid_index(&table_path, e.to_string()))?;
        if magic != TABLE_MAGIC {
            return Err(LemmatizerError::invalid_index(
                &table_path,
                "unknown magic header",
            ));
        }

        let table_len = table.metadata()?.len();
        if let Some(pointer) = directory
            .blocks
            .iter()
            .find(|pointer| !fits_in_table(pointer, table_len))
        {
            return Err(LemmatizerError::invalid_index(
                &metadata_path,
                format!(
                    "block at offset {} with length {} lies outside the {} byte table",
                    pointer.offset, pointer.length, table_len
                ),
            ));
        }

        info!(
            "opened disk table with {} records in {} blocks",
            directory.no_of_records(),
            directory.no_of_blocks()
        );
        Ok(Self {
            directory,
            table,
            table_path,
        })
    }

    pub fn directory(&self) -> &BlockDirectory {
        &self.directory
    }

    fn read_block(&self, pointer: &BlockPointer) -> io::Result<Block> {
        let mut bytes = vec![0u8; pointer.length as usize];
        read_exact_at(&self.table, &mut bytes, pointer.offset)?;
        Block::decode(&bytes, None)
    }
}

fn derive_table(data_dir: &Path) -> Result<()> {
    let data = LemmaData::load(&get_lemma_data_path(data_dir))?;
    write_disk_table(&data, data_dir, DEFAULT_BLOCK_SIZE)?;
    Ok(())
}

// a missing file or an unreadable timestamp never counts as older
fn is_older(path: &Path, than: &Path) -> bool {
    let modified = |path: &Path| fs::metadata(path).and_then(|m| m.modified()).ok();
    match (modified(path), modified(than)) {
        (Some(a), Some(b)) => a < b,
        _ => false,
    }
}

fn fits_in_table(pointer: &BlockPointer, table_len: u64) -> bool {
    pointer.offset >= TABLE_MAGIC.len() as u64
        && pointer
            .offset
            .checked_add(pointer.length as u64)
            .is_some_and(|end| end <= table_len)
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset)? {
            0 => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "block extends past the end of the table",
                ));
            }
            n => {
                buf = &mut std::mem::take(&mut buf)[n..];
                offset += n as u64;
            }
        }
    }
    Ok(())
}

impl LemmaStore for DiskIndex {
    fn lookup(&self, form: &str) -> FormLookup {
        let Some(pointer) = self.directory.locate(form) else {
            return FormLookup::Unknown;
        };
        let block = match self.read_block(pointer) {
            Ok(block) => block,
            Err(e) => {
                warn!(
                    "failed to read block at offset {} of {}: {}",
                    pointer.offset,
                    self.table_path.display(),
                    e
                );
                return FormLookup::Unknown;
            }
        };
        match block.find(form) {
            Some(DiskRecord::Invariant) => FormLookup::Invariant,
            Some(DiskRecord::Changeable(packed)) => FormLookup::Changeable(decode_entries(packed)),
            None => FormLookup::Unknown,
        }
    }

    fn no_of_invariant(&self) -> usize {
        self.directory.no_of_invariant as usize
    }

    fn no_of_changeable(&self) -> usize {
        self.directory.no_of_changeable as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::types::LemmaEntry;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    fn sample_data() -> LemmaData {
        let mut data = LemmaData::new();
        data.leave.insert("бег".to_string());
        data.leave.insert("дом".to_string());
        data.change.insert("бегчы".to_string(), "бег|V;|V".to_string());
        data.change.insert("дома".to_string(), "дом|N".to_string());
        data
    }

    #[test]
    fn test_lookup_after_write() {
        let dir = tempdir().unwrap();
        write_disk_table(&sample_data(), dir.path(), DEFAULT_BLOCK_SIZE).unwrap();
        let index = DiskIndex::open(dir.path()).unwrap();

        assert_eq!(index.lookup("дом"), FormLookup::Invariant);
        assert_eq!(
            index.lookup("бегчы"),
            FormLookup::Changeable(vec![LemmaEntry::new("бег", "V"), LemmaEntry::new("", "V")])
        );
        assert_eq!(index.lookup("вада"), FormLookup::Unknown);
        assert_eq!(index.lookup("а"), FormLookup::Unknown);
        assert_eq!(index.no_of_invariant(), 2);
        assert_eq!(index.no_of_changeable(), 2);
    }

    #[test]
    fn test_lookup_across_many_blocks() {
        let dir = tempdir().unwrap();
        let mut data = LemmaData::new();
        for i in 0..500 {
            data.change.insert(format!("форма{i:04}"), format!("лема{i}|N"));
            data.leave.insert(format!("слова{i:04}"));
        }
        write_disk_table(&data, dir.path(), 256).unwrap();
        let index = DiskIndex::open(dir.path()).unwrap();
        assert!(index.directory().no_of_blocks() > 10);

        for i in (0..500).step_by(37) {
            assert_eq!(
                index.lookup(&format!("форма{i:04}")),
                FormLookup::Changeable(vec![LemmaEntry::new(format!("лема{i}"), "N")])
            );
            assert_eq!(index.lookup(&format!("слова{i:04}")), FormLookup::Invariant);
        }
        assert_eq!(index.lookup("форма9999"), FormLookup::Unknown);
    }

    #[test]
    fn test_open_derives_table_from_json() {
        let dir = tempdir().unwrap();
        sample_data().save(&get_lemma_data_path(dir.path())).unwrap();

        let index = DiskIndex::open(dir.path()).unwrap();
        assert!(get_disk_table_path(dir.path()).exists());
        assert_eq!(index.lookup("бег"), FormLookup::Invariant);
    }

    #[test]
    fn test_open_without_data_is_unavailable() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            DiskIndex::open(dir.path()),
            Err(LemmatizerError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn test_open_rejects_corrupted_table() {
        let dir = tempdir().unwrap();
        write_disk_table(&sample_data(), dir.path(), DEFAULT_BLOCK_SIZE).unwrap();
        fs::write(get_disk_table_path(dir.path()), b"garbage that is long enough").unwrap();

        assert!(matches!(
            DiskIndex::open(dir.path()),
            Err(LemmatizerError::InvalidIndex { .. })
        ));
    }

    #[test]
    fn test_empty_table_finds_nothing() {
        let dir = tempdir().unwrap();
        write_disk_table(&LemmaData::new(), dir.path(), DEFAULT_BLOCK_SIZE).unwrap();
        let index = DiskIndex::open(dir.path()).unwrap();
        assert_eq!(index.lookup("дом"), FormLookup::Unknown);
    }

    #[test]
    fn test_concurrent_lookups_share_the_table() {
        let dir = tempdir().unwrap();
        let mut data = LemmaData::new();
        for i in 0..300 {
            data.change.insert(format!("форма{i:03}"), format!("лема{i}|N"));
        }
        write_disk_table(&data, dir.path(), 128).unwrap();
        let index = DiskIndex::open(dir.path()).unwrap();

        std::thread::scope(|scope| {
            for t in 0..4 {
                let index = &index;
                scope.spawn(move || {
                    for i in (t..300).step_by(4) {
                        assert_eq!(
                            index.lookup(&format!("форма{i:03}")),
                            FormLookup::Changeable(vec![LemmaEntry::new(format!("лема{i}"), "N")])
                        );
                    }
                });
            }
        });
    }

    #[test]
    fn test_open_rejects_block_past_end_of_table() {
        let dir = tempdir().unwrap();
        let mut directory = write_disk_table(&sample_data(), dir.path(), DEFAULT_BLOCK_SIZE).unwrap();
        directory.blocks[0].length = u32::MAX;
        directory
            .save(fs::File::create(get_disk_table_metadata_path(dir.path())).unwrap())
            .unwrap();

        assert!(matches!(
            DiskIndex::open(dir.path()),
            Err(LemmatizerError::InvalidIndex { .. })
        ));
    }

    #[test]
    fn test_stale_table_is_derived_again() {
        let dir = tempdir().unwrap();
        write_disk_table(&sample_data(), dir.path(), DEFAULT_BLOCK_SIZE).unwrap();

        let mut newer = LemmaData::new();
        newer.change.insert("дома".to_string(), "хата|N".to_string());
        newer.save(&get_lemma_data_path(dir.path())).unwrap();
        let an_hour_ago = SystemTime::now() - Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(get_disk_table_path(dir.path()))
            .unwrap()
            .set_modified(an_hour_ago)
            .unwrap();

        let index = DiskIndex::open(dir.path()).unwrap();
        assert_eq!(
            index.lookup("дома"),
            FormLookup::Changeable(vec![LemmaEntry::new("хата", "N")])
        );
        assert_eq!(index.lookup("дом"), FormLookup::Unknown);
    }

    #[test]
    fn test_up_to_date_table_is_kept() {
        let dir = tempdir().unwrap();
        let data = sample_data();
        data.save(&get_lemma_data_path(dir.path())).unwrap();
        write_disk_table(&data, dir.path(), 64).unwrap();
        let before = fs::metadata(get_disk_table_path(dir.path())).unwrap().modified().unwrap();

        DiskIndex::open(dir.path()).unwrap();
        let after = fs::metadata(get_disk_table_path(dir.path())).unwrap().modified().unwrap();
        assert_eq!(before, after);
    }
}
