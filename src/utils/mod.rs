pub mod lemma_data;
pub mod paths;
pub mod text;
pub mod types;
