use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::{
    config::{Config, StorageMode},
    errors::Result,
    lemmatizer::lemmatizer::Lemmatizer,
};

/// Hands out one shared [`Lemmatizer`] per storage mode.
///
/// Construction is expensive, so the first request for a mode builds the service and
/// later requests get the same `Arc`. The registry is an ordinary value owned by the
/// caller; nothing here is global. A failed construction is not cached and the next
/// request tries again.
pub struct LemmatizerRegistry {
    config: Config,
    memory: OnceCell<Arc<Lemmatizer>>,
    disk: OnceCell<Arc<Lemmatizer>>,
}

impl LemmatizerRegistry {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            memory: OnceCell::new(),
            disk: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The lemmatizer for the mode named in the configuration.
    pub fn get(&self) -> Result<Arc<Lemmatizer>> {
        self.get_with_mode(self.config.storage_mode()?)
    }

    pub fn get_with_mode(&self, mode: StorageMode) -> Result<Arc<Lemmatizer>> {
        let cell = match mode {
            StorageMode::Memory => &self.memory,
            StorageMode::Disk => &self.disk,
        };
        cell.get_or_try_init(|| {
            let config = Config {
                storage_mode: mode.to_string(),
                ..self.config.clone()
            };
            Lemmatizer::new(&config).map(Arc::new)
        })
        .cloned()
    }

    /// Forgets every cached lemmatizer, so the next request opens the index again.
    /// Needed after the index in the data directory has been rebuilt. Handles already
    /// given out keep answering from the index they were opened on.
    pub fn reset(&mut self) {
        self.memory.take();
        self.disk.take();
    }

    pub fn is_loaded(&self, mode: StorageMode) -> bool {
        match mode {
            StorageMode::Memory => self.memory.get().is_some(),
            StorageMode::Disk => self.disk.get().is_some(),
        }
    }
}
