pub mod config;
pub mod csv;
pub mod llm_clients;
pub mod report;
pub mod response;
