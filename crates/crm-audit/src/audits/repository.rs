use crate::companies::CompanyId;
use crate::error::RepositoryError;

use super::domain::{Audit, AuditFilter, AuditId, UserId};

/// Storage abstraction for audits. Single-row writes are expected to be atomic;
/// nothing here spans rows.
pub trait AuditRepository: Send + Sync {
    fn insert(&self, audit: Audit) -> Result<Audit, RepositoryError>;
    fn update(&self, audit: Audit) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &AuditId) -> Result<Option<Audit>, RepositoryError>;
    /// Matching audits ordered by scheduled date.
    fn list(&self, filter: &AuditFilter) -> Result<Vec<Audit>, RepositoryError>;
    fn count(&self, filter: &AuditFilter) -> Result<usize, RepositoryError>;
    fn delete(&self, id: &AuditId) -> Result<bool, RepositoryError>;
    /// Removes every audit owned by `company_id`, returning how many were removed.
    fn delete_for_company(&self, company_id: &CompanyId) -> Result<usize, RepositoryError>;
}

/// Lookup of users that may be assigned audits.
pub trait UserDirectory: Send + Sync {
    fn contains(&self, user: &UserId) -> Result<bool, RepositoryError>;
}
