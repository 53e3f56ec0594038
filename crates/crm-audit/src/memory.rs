//! In-memory repositories used by the service binary, the demo, and tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::audits::{Audit, AuditFilter, AuditId, AuditRepository, UserDirectory, UserId};
use crate::companies::{Company, CompanyFilter, CompanyId, CompanyRepository};
use crate::error::RepositoryError;

fn lock<'a, T>(mutex: &'a Mutex<T>, store: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{store} lock poisoned")))
}

#[derive(Default, Clone)]
pub struct InMemoryCompanyRepository {
    records: Arc<Mutex<HashMap<CompanyId, Company>>>,
}

impl CompanyRepository for InMemoryCompanyRepository {
    fn insert(&self, company: Company) -> Result<Company, RepositoryError> {
        let mut guard = lock(&self.records, "company store")?;
        if guard.contains_key(&company.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(company.id, company.clone());
        Ok(company)
    }

    fn update(&self, company: Company) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records, "company store")?;
        match guard.get_mut(&company.id) {
            Some(slot) => {
                *slot = company;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &CompanyId) -> Result<Option<Company>, RepositoryError> {
        let guard = lock(&self.records, "company store")?;
        Ok(guard.get(id).cloned())
    }

    fn list(&self, filter: &CompanyFilter) -> Result<Vec<Company>, RepositoryError> {
        let guard = lock(&self.records, "company store")?;
        let mut companies: Vec<Company> = guard
            .values()
            .filter(|company| filter.matches(company))
            .cloned()
            .collect();
        companies.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(companies)
    }

    fn delete(&self, id: &CompanyId) -> Result<bool, RepositoryError> {
        let mut guard = lock(&self.records, "company store")?;
        Ok(guard.remove(id).is_some())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryAuditRepository {
    records: Arc<Mutex<HashMap<AuditId, Audit>>>,
}

impl AuditRepository for InMemoryAuditRepository {
    fn insert(&self, audit: Audit) -> Result<Audit, RepositoryError> {
        let mut guard = lock(&self.records, "audit store")?;
        if guard.contains_key(&audit.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(audit.id, audit.clone());
        Ok(audit)
    }

    fn update(&self, audit: Audit) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records, "audit store")?;
        match guard.get_mut(&audit.id) {
            Some(slot) => {
                *slot = audit;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &AuditId) -> Result<Option<Audit>, RepositoryError> {
        let guard = lock(&self.records, "audit store")?;
        Ok(guard.get(id).cloned())
    }

    fn list(&self, filter: &AuditFilter) -> Result<Vec<Audit>, RepositoryError> {
        let guard = lock(&self.records, "audit store")?;
        let mut audits: Vec<Audit> = guard
            .values()
            .filter(|audit| filter.matches(audit))
            .cloned()
            .collect();
        audits.sort_by(|a, b| {
            a.scheduled_date
                .cmp(&b.scheduled_date)
                .then(a.id.cmp(&b.id))
        });
        Ok(audits)
    }

    fn count(&self, filter: &AuditFilter) -> Result<usize, RepositoryError> {
        let guard = lock(&self.records, "audit store")?;
        Ok(guard.values().filter(|audit| filter.matches(audit)).count())
    }

    fn delete(&self, id: &AuditId) -> Result<bool, RepositoryError> {
        let mut guard = lock(&self.records, "audit store")?;
        Ok(guard.remove(id).is_some())
    }

    fn delete_for_company(&self, company_id: &CompanyId) -> Result<usize, RepositoryError> {
        let mut guard = lock(&self.records, "audit store")?;
        let before = guard.len();
        guard.retain(|_, audit| audit.company_id != *company_id);
        Ok(before - guard.len())
    }
}

/// Fixed set of user ids, typically loaded from configuration.
#[derive(Default, Clone)]
pub struct StaticUserDirectory {
    users: Arc<HashSet<UserId>>,
}

impl StaticUserDirectory {
    pub fn new<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            users: Arc::new(users.into_iter().map(|user| UserId(user.into())).collect()),
        }
    }
}

impl UserDirectory for StaticUserDirectory {
    fn contains(&self, user: &UserId) -> Result<bool, RepositoryError> {
        Ok(self.users.contains(user))
    }
}
