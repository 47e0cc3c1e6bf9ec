pub mod in_memory_index;
