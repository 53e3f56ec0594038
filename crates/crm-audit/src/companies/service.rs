use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::audits::AuditRepository;
use crate::error::RepositoryError;

use super::domain::{
    Company, CompanyDraft, CompanyFilter, CompanyId, CompanyPatch, CompanyValidationError,
    MeetingRecord, PaymentRecord,
};
use super::repository::CompanyRepository;
use super::tiering::TierPolicy;

/// Company lifecycle: onboarding, tier cache upkeep, tracking fields, and deletion.
pub struct CompanyService<C, A> {
    companies: Arc<C>,
    audits: Arc<A>,
    policy: TierPolicy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierRefresh {
    pub evaluated: usize,
    pub changed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompanyDeletion {
    pub company_id: CompanyId,
    pub audits_removed: usize,
}

impl<C, A> CompanyService<C, A>
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
{
    pub fn new(companies: Arc<C>, audits: Arc<A>, policy: TierPolicy) -> Self {
        Self {
            companies,
            audits,
            policy,
        }
    }

    pub fn policy(&self) -> &TierPolicy {
        &self.policy
    }

    pub fn create(
        &self,
        draft: CompanyDraft,
        now: DateTime<Utc>,
    ) -> Result<Company, CompanyServiceError> {
        let today = now.date_naive();
        draft.validate(today)?;

        let tier = self.policy.classify(draft.start_date, draft.ad_spend, today);
        let company = Company {
            id: CompanyId::new(),
            name: draft.name.trim().to_string(),
            contact_name: draft.contact_name,
            email: draft.email.map(|email| email.trim().to_string()),
            phone: draft.phone,
            start_date: draft.start_date,
            ad_spend: draft.ad_spend,
            tier,
            last_payment_date: None,
            last_payment_amount: None,
            last_meeting_date: None,
            last_meeting_attendees: Vec::new(),
            last_meeting_duration_minutes: None,
            created_at: now,
            updated_at: now,
        };

        let stored = self.companies.insert(company)?;
        info!(company_id = %stored.id, tier = %stored.tier, "company onboarded");
        Ok(stored)
    }

    pub fn get(&self, id: &CompanyId) -> Result<Company, CompanyServiceError> {
        self.companies
            .fetch(id)?
            .ok_or(CompanyServiceError::NotFound(*id))
    }

    pub fn list(&self, filter: &CompanyFilter) -> Result<Vec<Company>, CompanyServiceError> {
        Ok(self.companies.list(filter)?)
    }

    /// Applies the patch and recomputes the cached tier.
    pub fn update(
        &self,
        id: &CompanyId,
        patch: CompanyPatch,
        now: DateTime<Utc>,
    ) -> Result<Company, CompanyServiceError> {
        let today = now.date_naive();
        patch.validate(today)?;

        let mut company = self.get(id)?;
        patch.apply(&mut company);
        company.tier = self
            .policy
            .classify(company.start_date, company.ad_spend, today);
        company.updated_at = now;

        self.companies.update(company.clone())?;
        Ok(company)
    }

    /// Re-classifies every company; only companies whose tier moved are written.
    pub fn update_all_tiers(&self, now: DateTime<Utc>) -> Result<TierRefresh, CompanyServiceError> {
        let today = now.date_naive();
        let mut refresh = TierRefresh::default();

        for mut company in self.companies.list(&CompanyFilter::default())? {
            refresh.evaluated += 1;
            let tier = self
                .policy
                .classify(company.start_date, company.ad_spend, today);
            if tier != company.tier {
                info!(company_id = %company.id, from = %company.tier, to = %tier, "tier changed");
                company.tier = tier;
                company.updated_at = now;
                self.companies.update(company)?;
                refresh.changed += 1;
            }
        }

        Ok(refresh)
    }

    pub fn record_payment(
        &self,
        id: &CompanyId,
        payment: PaymentRecord,
        now: DateTime<Utc>,
    ) -> Result<Company, CompanyServiceError> {
        payment.validate(now.date_naive())?;

        let mut company = self.get(id)?;
        let newer = company
            .last_payment_date
            .map_or(true, |last| payment.paid_on >= last);
        if newer {
            company.last_payment_date = Some(payment.paid_on);
            company.last_payment_amount = Some(payment.amount);
            company.updated_at = now;
            self.companies.update(company.clone())?;
        }
        Ok(company)
    }

    pub fn record_meeting(
        &self,
        id: &CompanyId,
        meeting: MeetingRecord,
        now: DateTime<Utc>,
    ) -> Result<Company, CompanyServiceError> {
        meeting.validate()?;

        let mut company = self.get(id)?;
        let newer = company
            .last_meeting_date
            .map_or(true, |last| meeting.held_on >= last);
        if newer {
            company.last_meeting_date = Some(meeting.held_on);
            company.last_meeting_attendees = meeting.attendees;
            company.last_meeting_duration_minutes = Some(meeting.duration_minutes);
            company.updated_at = now;
            self.companies.update(company.clone())?;
        }
        Ok(company)
    }

    /// Deletes the company's audits first, then the company.
    ///
    /// A failed audit purge leaves the company untouched. A failed company delete
    /// after the purge leaves a company without audits, which a bulk reschedule
    /// repairs. Audits never outlive their company.
    pub fn delete(&self, id: &CompanyId) -> Result<CompanyDeletion, CompanyServiceError> {
        self.get(id)?;

        let audits_removed = self.audits.delete_for_company(id)?;
        match self.companies.delete(id) {
            Ok(true) => {
                info!(company_id = %id, audits_removed, "company deleted");
                Ok(CompanyDeletion {
                    company_id: *id,
                    audits_removed,
                })
            }
            Ok(false) => Err(CompanyServiceError::NotFound(*id)),
            Err(err) => {
                warn!(company_id = %id, audits_removed, error = %err, "company delete failed after audit purge");
                Err(err.into())
            }
        }
    }
}

/// Error raised by the company service.
#[derive(Debug, thiserror::Error)]
pub enum CompanyServiceError {
    #[error("company {0} not found")]
    NotFound(CompanyId),
    #[error(transparent)]
    Validation(#[from] CompanyValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
