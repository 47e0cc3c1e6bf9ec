pub mod corpus;
pub mod indexer;
