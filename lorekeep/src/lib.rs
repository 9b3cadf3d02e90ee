use lorekeep_core::KnowledgeBase;

pub mod cli;
pub mod commands;
pub mod config;

pub struct AppContext {
    pub knowledge_base: KnowledgeBase,
}
