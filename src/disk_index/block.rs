use std::io::{self, Read};

use crate::disk_index::DEFAULT_BLOCK_SIZE;

const ZSTD_LEVEL: i32 = 3;

// form length, kind and packed length of a record with an empty form
const MIN_RECORD_SIZE: usize = 4 + 1 + 4;

const KIND_INVARIANT: u8 = 0;
const KIND_CHANGEABLE: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskRecord {
    Invariant,
    // packed `lemma|pos;...` entries, same encoding as the json artifact
    Changeable(String),
}

/*
 The unit of storage in the disk table is a block.
 A block holds a run of records sorted by form. Its layout before compression is
 the number of records followed by each record as
   form length (u32) | form bytes | kind (u8) | packed length (u32) | packed bytes
 The whole block is then compressed with zstd, so a lookup reads and inflates
 exactly one block.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub max_block_size: usize,
    pub current_block_size: usize,
    pub forms: Vec<String>,
    pub records: Vec<DiskRecord>,
}

impl Block {
    pub fn new(max_block_size: Option<usize>) -> Self {
        Self {
            max_block_size: max_block_size.unwrap_or(DEFAULT_BLOCK_SIZE),
            current_block_size: 4,
            forms: Vec::new(),
            records: Vec::new(),
        }
    }

    // the no_of_records header always takes 4 bytes
    pub fn reset(&mut self) {
        self.current_block_size = 4;
        self.forms.clear();
        self.records.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    pub fn no_of_records(&self) -> usize {
        self.forms.len()
    }

    pub fn first_form(&self) -> Option<&str> {
        self.forms.first().map(String::as_str)
    }

    fn record_size(form: &str, record: &DiskRecord) -> usize {
        let packed_len = match record {
            DiskRecord::Invariant => 0,
            DiskRecord::Changeable(packed) => packed.len(),
        };
        4 + form.len() + 1 + 4 + packed_len
    }

    // an empty block accepts any record so oversized records still get a block of their own
    pub fn has_space_for(&self, form: &str, record: &DiskRecord) -> bool {
        self.is_empty()
            || self.current_block_size + Self::record_size(form, record) <= self.max_block_size
    }

    pub fn add_record(&mut self, form: &str, record: DiskRecord) {
        self.current_block_size += Self::record_size(form, &record);
        self.forms.push(form.to_string());
        self.records.push(record);
    }

    pub fn find(&self, form: &str) -> Option<&DiskRecord> {
        self.forms
            .binary_search_by(|candidate| candidate.as_str().cmp(form))
            .ok()
            .map(|index| &self.records[index])
    }

    pub fn encode(&self) -> io::Result<Vec<u8>> {
        assert_eq!(self.forms.len(), self.records.len());
        let mut raw = Vec::with_capacity(self.current_block_size);
        raw.extend_from_slice(&(self.forms.len() as u32).to_le_bytes());
        for (form, record) in self.forms.iter().zip(&self.records) {
            raw.extend_from_slice(&(form.len() as u32).to_le_bytes());
            raw.extend_from_slice(form.as_bytes());
            match record {
                DiskRecord::Invariant => {
                    raw.push(KIND_INVARIANT);
                    raw.extend_from_slice(&0u32.to_le_bytes());
                }
                DiskRecord::Changeable(packed) => {
                    raw.push(KIND_CHANGEABLE);
                    raw.extend_from_slice(&(packed.len() as u32).to_le_bytes());
                    raw.extend_from_slice(packed.as_bytes());
                }
            }
        }
        zstd::encode_all(&raw[..], ZSTD_LEVEL)
    }

    pub fn decode(bytes: &[u8], max_block_size: Option<usize>) -> io::Result<Self> {
        let raw = zstd::decode_all(bytes)?;
        let mut reader = &raw[..];
        let mut block = Block::new(max_block_size);

        let no_of_records = read_u32(&mut reader)? as usize;
        // the count comes from disk, never reserve more than the bytes could hold
        let capacity = no_of_records.min(reader.len() / MIN_RECORD_SIZE);
        block.forms.reserve(capacity);
        block.records.reserve(capacity);
        for _ in 0..no_of_records {
            let form = read_string(&mut reader)?;
            let mut kind = [0u8; 1];
            reader.read_exact(&mut kind)?;
            let packed = read_string(&mut reader)?;
            let record = match kind[0] {
                KIND_INVARIANT => DiskRecord::Invariant,
                KIND_CHANGEABLE => DiskRecord::Changeable(packed),
                other => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("unknown record kind {other}"),
                    ));
                }
            };
            block.add_record(&form, record);
        }
        Ok(block)
    }
}

pub(crate) fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

// the buffer only grows as far as the reader actually has bytes, a corrupted length
// fails with UnexpectedEof instead of allocating it up front
pub(crate) fn read_string<R: Read>(reader: &mut R) -> io::Result<String> {
    let len = read_u32(reader)? as u64;
    let mut bytes = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut bytes)?;
    if bytes.len() as u64 != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("string of {len} bytes cut short at {}", bytes.len()),
        ));
    }
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
