pub mod config;
pub mod search;
pub mod storage;

pub use config::{IndexPolicy, StoreConfig};
pub use storage::{Error, KnowledgeBase, Result};
