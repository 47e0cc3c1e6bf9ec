//! Belarusian lemma lookup.
//!
//! The [`indexer`] turns a grammar corpus of paradigm XML documents into a form-to-lemma
//! index, the [`Lemmatizer`] answers lookups against it either fully in memory or from
//! a block table on disk.

pub mod config;
pub mod disk_index;
pub mod errors;
#[cfg(feature = "download")]
pub mod fetch;
pub mod in_memory_index;
pub mod indexer;
pub mod lemmatizer;
pub mod utils;

pub use crate::config::{Config, StorageMode};
pub use crate::errors::{LemmatizerError, Result};
pub use crate::lemmatizer::{lemmatizer::Lemmatizer, registry::LemmatizerRegistry};
