use std::{
    collections::BTreeMap,
    fs,
    io::{self, BufWriter, Write},
    path::Path,
};

use tempfile::NamedTempFile;
use tracing::info;

use crate::{
    disk_index::{
        block::{Block, DiskRecord},
        block_directory::{BlockDirectory, BlockPointer, TABLE_MAGIC},
    },
    errors::Result,
    utils::{
        lemma_data::LemmaData,
        paths::{get_disk_table_metadata_path, get_disk_table_path},
    },
};

/// Streams sorted records into compressed blocks and records where each block landed.
pub struct DiskIndexWriter<W: Write> {
    writer: W,
    block: Block,
    offset: u64,
    directory: BlockDirectory,
    last_form: Option<String>,
}

impl<W: Write> DiskIndexWriter<W> {
    pub fn new(mut writer: W, max_block_size: Option<usize>) -> io::Result<Self> {
        writer.write_all(TABLE_MAGIC)?;
        Ok(Self {
            writer,
            block: Block::new(max_block_size),
            offset: TABLE_MAGIC.len() as u64,
            directory: BlockDirectory::new(),
            last_form: None,
        })
    }

    // forms must arrive in strictly ascending byte order, lookups binary search on it
    pub fn add_record(&mut self, form: &str, record: DiskRecord) -> io::Result<()> {
        if let Some(last_form) = &self.last_form {
            if last_form.as_str() >= form {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("form '{form}' added after '{last_form}'"),
                ));
            }
        }

        if !self.block.has_space_for(form, &record) {
            self.flush_block()?;
        }
        match record {
            DiskRecord::Invariant => self.directory.no_of_invariant += 1,
            DiskRecord::Changeable(_) => self.directory.no_of_changeable += 1,
        }
        self.block.add_record(form, record);
        self.last_form = Some(form.to_string());
        Ok(())
    }

    fn flush_block(&mut self) -> io::Result<()> {
        let Some(first_form) = self.block.first_form().map(str::to_string) else {
            return Ok(());
        };
        let bytes = self.block.encode()?;
        self.writer.write_all(&bytes)?;
        self.directory.blocks.push(BlockPointer {
            first_form,
            offset: self.offset,
            length: bytes.len() as u32,
        });
        self.offset += bytes.len() as u64;
        self.block.reset();
        Ok(())
    }

    pub fn finish(mut self) -> io::Result<BlockDirectory> {
        self.flush_block()?;
        self.writer.flush()?;
        Ok(self.directory)
    }
}

/// A disk table fully written to temporaries in its data directory but not yet in place.
pub struct StagedDiskTable {
    table_file: NamedTempFile,
    metadata_file: NamedTempFile,
    directory: BlockDirectory,
}

impl StagedDiskTable {
    pub fn directory(&self) -> &BlockDirectory {
        &self.directory
    }

    pub fn persist(self, data_dir: &Path) -> Result<BlockDirectory> {
        self.table_file.persist(get_disk_table_path(data_dir))?;
        self.metadata_file
            .persist(get_disk_table_metadata_path(data_dir))?;
        info!(
            "disk table written with {} records in {} blocks",
            self.directory.no_of_records(),
            self.directory.no_of_blocks()
        );
        Ok(self.directory)
    }
}

/// Writes the disk table and its block directory for `data` into temporaries inside
/// `data_dir`. Nothing is visible to readers until [`StagedDiskTable::persist`].
pub fn stage_disk_table(
    data: &LemmaData,
    data_dir: &Path,
    max_block_size: usize,
) -> Result<StagedDiskTable> {
    fs::create_dir_all(data_dir)?;

    let mut records: BTreeMap<&str, DiskRecord> = BTreeMap::new();
    for form in &data.leave {
        records.insert(form.as_str(), DiskRecord::Invariant);
    }
    for (form, packed) in &data.change {
        records.insert(form.as_str(), DiskRecord::Changeable(packed.clone()));
    }

    let table_file = NamedTempFile::new_in(data_dir)?;
    let mut writer = DiskIndexWriter::new(BufWriter::new(table_file.as_file()), Some(max_block_size))?;
    for (form, record) in records {
        writer.add_record(form, record)?;
    }
    let directory = writer.finish()?;

    let metadata_file = NamedTempFile::new_in(data_dir)?;
    directory.save(BufWriter::new(metadata_file.as_file()))?;

    Ok(StagedDiskTable {
        table_file,
        metadata_file,
        directory,
    })
}

/// Writes the disk table and its block directory for `data` into `data_dir`.
pub fn write_disk_table(
    data: &LemmaData,
    data_dir: &Path,
    max_block_size: usize,
) -> Result<BlockDirectory> {
    stage_disk_table(data, data_dir, max_block_size)?.persist(data_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn test_single_block_layout() {
        let mut bytes = Vec::new();
        let mut writer = DiskIndexWriter::new(Cursor::new(&mut bytes), None).unwrap();
        writer.add_record("бег", DiskRecord::Invariant).unwrap();
        writer
            .add_record("бегчы", DiskRecord::Changeable("бег|V;|V".to_string()))
            .unwrap();
        let directory = writer.finish().unwrap();

        assert_eq!(directory.no_of_blocks(), 1);
        assert_eq!(directory.no_of_invariant, 1);
        assert_eq!(directory.no_of_changeable, 1);
        assert!(bytes.starts_with(TABLE_MAGIC));

        let pointer = &directory.blocks[0];
        assert_eq!(pointer.first_form, "бег");
        assert_eq!(pointer.offset, TABLE_MAGIC.len() as u64);
        let start = pointer.offset as usize;
        let block = Block::decode(&bytes[start..start + pointer.length as usize], None).unwrap();
        assert_eq!(block.forms, vec!["бег", "бегчы"]);
    }

    #[test]
    fn test_small_blocks_split_records() {
        let mut bytes = Vec::new();
        let mut writer = DiskIndexWriter::new(Cursor::new(&mut bytes), Some(32)).unwrap();
        for form in ["a", "b", "c", "d", "e", "f"] {
            writer
                .add_record(form, DiskRecord::Changeable("lemma|N".to_string()))
                .unwrap();
        }
        let directory = writer.finish().unwrap();

        assert!(directory.no_of_blocks() > 1);
        assert_eq!(directory.no_of_records(), 6);
        let end = directory
            .blocks
            .iter()
            .map(|p| p.offset + p.length as u64)
            .max()
            .unwrap();
        assert_eq!(end as usize, bytes.len());
    }

    #[test]
    fn test_unsorted_input_is_rejected() {
        let mut writer = DiskIndexWriter::new(Vec::new(), None).unwrap();
        writer.add_record("дом", DiskRecord::Invariant).unwrap();
        let err = writer.add_record("бег", DiskRecord::Invariant).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let err = writer.add_record("дом", DiskRecord::Invariant).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_empty_table_has_no_blocks() {
        let writer = DiskIndexWriter::new(Vec::new(), None).unwrap();
        let directory = writer.finish().unwrap();
        assert_eq!(directory.no_of_blocks(), 0);
    }

    #[test]
    fn test_write_disk_table_creates_both_files() {
        let dir = tempdir().unwrap();
        let mut data = LemmaData::new();
        data.leave.insert("дом".to_string());
        data.change.insert("дома".to_string(), "дом|N".to_string());

        let directory = write_disk_table(&data, dir.path(), 4096).unwrap();
        assert_eq!(directory.no_of_records(), 2);
        assert!(get_disk_table_path(dir.path()).exists());

        let saved = fs::read(get_disk_table_metadata_path(dir.path())).unwrap();
        assert_eq!(BlockDirectory::load(&saved[..]).unwrap(), directory);
    }

    #[test]
    fn test_staged_table_is_invisible_until_persisted() {
        let dir = tempdir().unwrap();
        let mut data = LemmaData::new();
        data.leave.insert("дом".to_string());

        let staged = stage_disk_table(&data, dir.path(), 4096).unwrap();
        assert_eq!(staged.directory().no_of_records(), 1);
        assert!(!get_disk_table_path(dir.path()).exists());
        assert!(!get_disk_table_metadata_path(dir.path()).exists());

        staged.persist(dir.path()).unwrap();
        assert!(get_disk_table_path(dir.path()).exists());
        assert!(get_disk_table_metadata_path(dir.path()).exists());
    }

    #[test]
    fn test_dropped_stage_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        drop(stage_disk_table(&LemmaData::new(), dir.path(), 4096).unwrap());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
