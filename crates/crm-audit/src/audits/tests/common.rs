use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::audits::{Audit, AuditFilter, AuditId, AuditRepository, AuditScheduler, UserId};
use crate::cache::MokaResponseCache;
use crate::companies::{Company, CompanyId, CompanyRepository, Tier, TierPolicy};
use crate::config::CacheConfig;
use crate::error::RepositoryError;
use crate::memory::{InMemoryAuditRepository, InMemoryCompanyRepository, StaticUserDirectory};
use crate::state::{crm_router, CrmState};

pub(super) type MemoryScheduler =
    AuditScheduler<InMemoryCompanyRepository, InMemoryAuditRepository, StaticUserDirectory>;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 15, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn auditor() -> UserId {
    UserId("dana".to_string())
}

pub(super) fn users() -> Arc<StaticUserDirectory> {
    Arc::new(StaticUserDirectory::new(["dana", "lee"]))
}

pub(super) fn company(days_old: i64, ad_spend: f64) -> Company {
    let start_date = now().date_naive() - Duration::days(days_old);
    Company {
        id: CompanyId::new(),
        name: format!("Company {days_old}d"),
        contact_name: None,
        email: None,
        phone: None,
        start_date,
        ad_spend,
        tier: TierPolicy::default().classify(start_date, ad_spend, now().date_naive()),
        last_payment_date: None,
        last_payment_amount: None,
        last_meeting_date: None,
        last_meeting_attendees: Vec::new(),
        last_meeting_duration_minutes: None,
        created_at: now(),
        updated_at: now(),
    }
}

pub(super) struct Fixture {
    pub(super) scheduler: MemoryScheduler,
    pub(super) companies: Arc<InMemoryCompanyRepository>,
    pub(super) audits: Arc<InMemoryAuditRepository>,
}

impl Fixture {
    pub(super) fn new() -> Self {
        let companies = Arc::new(InMemoryCompanyRepository::default());
        let audits = Arc::new(InMemoryAuditRepository::default());
        let scheduler = AuditScheduler::new(companies.clone(), audits.clone(), users());
        Self {
            scheduler,
            companies,
            audits,
        }
    }

    pub(super) fn add_company(&self, days_old: i64, ad_spend: f64) -> Company {
        self.companies
            .insert(company(days_old, ad_spend))
            .expect("company insert succeeds")
    }

    pub(super) fn add_audit(&self, company_id: CompanyId, due_in_days: i64) -> Audit {
        let audit = Audit::scheduled(
            company_id,
            auditor(),
            now() + Duration::days(due_in_days),
            now() - Duration::days(30),
        );
        self.audits.insert(audit).expect("audit insert succeeds")
    }

    pub(super) fn outstanding_for(&self, company_id: CompanyId) -> Vec<Audit> {
        self.audits
            .list(&AuditFilter::for_company(company_id))
            .expect("list succeeds")
            .into_iter()
            .filter(Audit::is_outstanding)
            .collect()
    }
}

pub(super) fn assert_tier(company: &Company, tier: Tier) {
    assert_eq!(company.tier, tier, "unexpected tier for {}", company.name);
}

pub(super) struct UnavailableAuditRepository;

impl AuditRepository for UnavailableAuditRepository {
    fn insert(&self, _audit: Audit) -> Result<Audit, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _audit: Audit) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &AuditId) -> Result<Option<Audit>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _filter: &AuditFilter) -> Result<Vec<Audit>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn count(&self, _filter: &AuditFilter) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: &AuditId) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_for_company(&self, _company_id: &CompanyId) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn memory_router() -> (
    axum::Router,
    Arc<InMemoryCompanyRepository>,
    Arc<InMemoryAuditRepository>,
) {
    let companies = Arc::new(InMemoryCompanyRepository::default());
    let audits = Arc::new(InMemoryAuditRepository::default());
    let cache = Arc::new(MokaResponseCache::new(&CacheConfig {
        max_entries: 64,
        ttl: std::time::Duration::from_secs(60),
    }));
    let state = Arc::new(CrmState::new(
        companies.clone(),
        audits.clone(),
        users(),
        TierPolicy::default(),
        cache,
    ));
    (crm_router(state), companies, audits)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
