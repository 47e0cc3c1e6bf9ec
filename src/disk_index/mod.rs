pub mod block;
pub mod block_directory;
pub mod disk_index;
pub mod disk_index_writer;

// uncompressed size a block may grow to before it is flushed
pub const DEFAULT_BLOCK_SIZE: usize = 16 * 1024;
