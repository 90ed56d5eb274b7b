use crate::domain::error::Result;

/// Optional correction backend consulted after the local matching tiers.
///
/// `Ok(None)` is an explicit "no match". Errors are treated as a backend
/// failure by the caller and never surface as validation errors.
pub trait ExternalResolver {
    fn resolve(&self, value: &str, reference: &[String], field: &str) -> Result<Option<String>>;

    /// Short name used in logs
    fn name(&self) -> &str;
}
