pub mod audit_service;
pub mod category_aggregator;
pub mod file_auditor;
pub mod fuzzy_matcher;
pub mod llm_resolver;
pub mod row_validator;
pub mod schema_normalizer;
