use std::sync::Arc;

use axum::Router;

use crate::audits::{audit_router, AuditRepository, AuditScheduler, UserDirectory};
use crate::cache::ResponseCache;
use crate::companies::{company_router, CompanyRepository, CompanyService, TierPolicy};

/// Everything the HTTP layer needs, shared behind one `Arc`.
pub struct CrmState<C, A, U> {
    pub companies: CompanyService<C, A>,
    pub audits: AuditScheduler<C, A, U>,
    pub cache: Arc<dyn ResponseCache>,
}

impl<C, A, U> CrmState<C, A, U>
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    pub fn new(
        companies: Arc<C>,
        audits: Arc<A>,
        users: Arc<U>,
        policy: TierPolicy,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        Self {
            companies: CompanyService::new(companies.clone(), audits.clone(), policy),
            audits: AuditScheduler::new(companies, audits, users),
            cache,
        }
    }
}

pub fn crm_router<C, A, U>(state: Arc<CrmState<C, A, U>>) -> Router
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    company_router(state.clone()).merge(audit_router(state))
}
