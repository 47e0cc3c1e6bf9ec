pub mod lemmatizer;
pub mod registry;
pub mod store;
