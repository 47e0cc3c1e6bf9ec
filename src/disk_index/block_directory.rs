use std::io::{self, Read, Write};

use crate::disk_index::block::{read_string, read_u32};

/// Magic bytes at the start of both the table and its block directory.
pub const TABLE_MAGIC: &[u8] = b"LemmatizerBeTable 1\n";

// the block count is read from disk, larger directories grow as they are read
const MAX_PREALLOCATED_BLOCKS: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPointer {
    pub first_form: String,
    pub offset: u64,
    pub length: u32,
}

// The only part of the disk table kept in memory: where every block starts and the
// smallest form it holds. A form can only live in the last block whose first form
// is not greater than it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockDirectory {
    pub no_of_invariant: u32,
    pub no_of_changeable: u32,
    pub blocks: Vec<BlockPointer>,
}

impl BlockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_of_records(&self) -> u32 {
        self.no_of_invariant + self.no_of_changeable
    }

    pub fn no_of_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn locate(&self, form: &str) -> Option<&BlockPointer> {
        let index = self
            .blocks
            .partition_point(|pointer| pointer.first_form.as_str() <= form);
        if index == 0 {
            return None;
        }
        self.blocks.get(index - 1)
    }

    pub fn save<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(TABLE_MAGIC)?;
        writer.write_all(&self.no_of_invariant.to_le_bytes())?;
        writer.write_all(&self.no_of_changeable.to_le_bytes())?;

        writer.write_all(&(self.blocks.len() as u32).to_le_bytes())?;
        for pointer in &self.blocks {
            writer.write_all(&(pointer.first_form.len() as u32).to_le_bytes())?;
            writer.write_all(pointer.first_form.as_bytes())?;
            writer.write_all(&pointer.offset.to_le_bytes())?;
            writer.write_all(&pointer.length.to_le_bytes())?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn load<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut magic = vec![0u8; TABLE_MAGIC.len()];
        reader.read_exact(&mut magic)?;
        if magic != TABLE_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "block directory has an unknown magic header",
            ));
        }

        let no_of_invariant = read_u32(&mut reader)?;
        let no_of_changeable = read_u32(&mut reader)?;

        let no_of_blocks = read_u32(&mut reader)? as usize;
        let mut blocks = Vec::with_capacity(no_of_blocks.min(MAX_PREALLOCATED_BLOCKS));
        let mut buf = [0u8; 8];
        for _ in 0..no_of_blocks {
            let first_form = read_string(&mut reader)?;
            reader.read_exact(&mut buf)?;
            let offset = u64::from_le_bytes(buf);
            let length = read_u32(&mut reader)?;
            blocks.push(BlockPointer {
                first_form,
                offset,
                length,
            });
        }

        if blocks
            .windows(2)
            .any(|pair| pair[0].first_form >= pair[1].first_form)
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "block directory is not sorted",
            ));
        }

        Ok(Self {
            no_of_invariant,
            no_of_changeable,
            blocks,
        })
    }
}
