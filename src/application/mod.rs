pub mod use_cases;

pub use use_cases::audit_service::{AuditService, SubmittedFile};
pub use use_cases::fuzzy_matcher::FuzzyMatcher;
pub use use_cases::llm_resolver::LlmResolver;
