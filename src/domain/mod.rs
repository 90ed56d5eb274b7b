pub mod audit;
pub mod audit_config;
pub mod error;
pub mod llm_config;
pub mod resolver;

// CSV table types
pub mod csv;
