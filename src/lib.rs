pub mod agent;
pub mod api;
pub mod config;
pub mod db;
pub mod doc_processor;
pub mod llm;
pub mod slug;
pub mod store;
pub mod translate;
