use crate::error::RepositoryError;

use super::domain::{Company, CompanyFilter, CompanyId};

/// Storage abstraction for companies so services can be exercised in isolation.
pub trait CompanyRepository: Send + Sync {
    fn insert(&self, company: Company) -> Result<Company, RepositoryError>;
    fn update(&self, company: Company) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &CompanyId) -> Result<Option<Company>, RepositoryError>;
    fn list(&self, filter: &CompanyFilter) -> Result<Vec<Company>, RepositoryError>;
    /// Returns `false` when no company with `id` existed.
    fn delete(&self, id: &CompanyId) -> Result<bool, RepositoryError>;
}
