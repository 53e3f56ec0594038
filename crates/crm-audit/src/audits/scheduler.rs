use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::companies::{Company, CompanyFilter, CompanyId, CompanyRepository};
use crate::error::RepositoryError;

use super::cadence::{next_audit_date, AuditCadence};
use super::domain::{
    validate_notes, Audit, AuditCompletion, AuditDraft, AuditFilter, AuditId, AuditPatch,
    AuditStatistics, AuditStatus, AuditValidationError, OverdueSweep, ScheduleRefresh, UserId,
};
use super::repository::{AuditRepository, UserDirectory};

/// Service owning audit due dates: initial scheduling, completion chaining,
/// overdue sweeps, and bulk rescheduling.
pub struct AuditScheduler<C, A, U> {
    companies: Arc<C>,
    audits: Arc<A>,
    users: Arc<U>,
}

impl<C, A, U> AuditScheduler<C, A, U>
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    pub fn new(companies: Arc<C>, audits: Arc<A>, users: Arc<U>) -> Self {
        Self {
            companies,
            audits,
            users,
        }
    }

    /// Creates one scheduled audit at `now` plus the company's current cadence.
    ///
    /// Does not look for an existing outstanding audit; see [`Self::outstanding_audit`].
    pub fn schedule_initial_audit(
        &self,
        company_id: &CompanyId,
        assigned_to: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Audit, SchedulerError> {
        let company = self.company(company_id)?;
        self.ensure_user(assigned_to)?;

        let audit = self.schedule_from(&company, assigned_to.clone(), now)?;
        info!(
            company_id = %company.id,
            audit_id = %audit.id,
            scheduled_date = %audit.scheduled_date,
            "initial audit scheduled"
        );
        Ok(audit)
    }

    /// Closes the audit and chains its successor so the company keeps one outstanding audit.
    pub fn complete_audit(
        &self,
        audit_id: &AuditId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<AuditCompletion, SchedulerError> {
        validate_notes(notes.as_deref())?;

        let mut audit = self.audit(audit_id)?;
        if audit.status == AuditStatus::Completed {
            return Err(SchedulerError::AlreadyCompleted(audit.id));
        }
        let company = self.company(&audit.company_id)?;

        audit.status = AuditStatus::Completed;
        audit.completed_date = Some(now);
        if notes.is_some() {
            audit.notes = notes;
        }
        self.audits.update(audit.clone())?;

        let successor = match self.earliest_outstanding(&company.id, Some(&audit.id))? {
            Some(existing) => {
                debug!(audit_id = %existing.id, "outstanding audit already present, not chaining");
                existing
            }
            None => self.schedule_from(&company, audit.assigned_to.clone(), now)?,
        };

        info!(
            audit_id = %audit.id,
            successor_id = %successor.id,
            next_due = %successor.scheduled_date,
            "audit completed"
        );
        Ok(AuditCompletion {
            completed: audit,
            successor,
        })
    }

    /// Marks every scheduled audit that is past due as overdue.
    pub fn process_overdue_audits(&self, now: DateTime<Utc>) -> Result<OverdueSweep, SchedulerError> {
        let filter = AuditFilter {
            status: Some(AuditStatus::Scheduled),
            due_before: Some(now),
            ..AuditFilter::default()
        };

        let mut audits = Vec::new();
        for mut audit in self.audits.list(&filter)? {
            audit.status = AuditStatus::Overdue;
            self.audits.update(audit.clone())?;
            audits.push(audit);
        }

        if !audits.is_empty() {
            info!(marked = audits.len(), "audits marked overdue");
        }
        Ok(OverdueSweep {
            marked_count: audits.len(),
            audits,
        })
    }

    /// Re-dates each company's outstanding scheduled audit to its current cadence and
    /// schedules an audit for companies that have none.
    ///
    /// Audits whose date was set by hand keep it.
    ///
    /// New audits go to the company's most recent assignee, else `fallback_assignee`.
    pub fn update_all_schedules(
        &self,
        fallback_assignee: &UserId,
        now: DateTime<Utc>,
    ) -> Result<ScheduleRefresh, SchedulerError> {
        self.ensure_user(fallback_assignee)?;
        let today = now.date_naive();
        let mut refresh = ScheduleRefresh::default();

        for company in self.companies.list(&CompanyFilter::default())? {
            let history = self.audits.list(&AuditFilter::for_company(company.id))?;
            let cadence = AuditCadence::for_company(company.start_date, today);

            match history.iter().find(|audit| audit.is_outstanding()) {
                Some(outstanding)
                    if outstanding.status == AuditStatus::Scheduled && !outstanding.manual_date =>
                {
                    let target = next_audit_date(cadence, outstanding.created_at);
                    if target != outstanding.scheduled_date {
                        let mut audit = outstanding.clone();
                        audit.scheduled_date = target;
                        self.audits.update(audit)?;
                        refresh.updated += 1;
                    }
                }
                Some(_) => {}
                None => {
                    let assignee = history
                        .iter()
                        .max_by_key(|audit| audit.created_at)
                        .map(|audit| audit.assigned_to.clone())
                        .unwrap_or_else(|| fallback_assignee.clone());
                    self.schedule_from(&company, assignee, now)?;
                    refresh.created += 1;
                }
            }
        }

        info!(
            updated = refresh.updated,
            created = refresh.created,
            "audit schedules refreshed"
        );
        Ok(refresh)
    }

    pub fn get_statistics(&self, now: DateTime<Utc>) -> Result<AuditStatistics, SchedulerError> {
        let upcoming = AuditFilter {
            status: Some(AuditStatus::Scheduled),
            due_from: Some(now),
            due_until: Some(now + Duration::days(7)),
            ..AuditFilter::default()
        };

        Ok(AuditStatistics {
            total: self.audits.count(&AuditFilter::default())?,
            completed: self
                .audits
                .count(&AuditFilter::with_status(AuditStatus::Completed))?,
            scheduled: self
                .audits
                .count(&AuditFilter::with_status(AuditStatus::Scheduled))?,
            overdue: self
                .audits
                .count(&AuditFilter::with_status(AuditStatus::Overdue))?,
            upcoming_week: self.audits.count(&upcoming)?,
        })
    }

    /// Manually schedules an audit. Refused while the company has one outstanding.
    pub fn create_audit(
        &self,
        draft: AuditDraft,
        now: DateTime<Utc>,
    ) -> Result<Audit, SchedulerError> {
        let assigned_to = UserId::parse(draft.assigned_to.as_deref())?;
        validate_notes(draft.notes.as_deref())?;
        let company = self.company(&draft.company_id)?;
        self.ensure_user(&assigned_to)?;

        if let Some(existing) = self.outstanding_audit(&company.id)? {
            return Err(SchedulerError::OutstandingAudit {
                company_id: company.id,
                audit_id: existing.id,
            });
        }

        let mut audit = Audit::scheduled(company.id, assigned_to, draft.scheduled_date, now);
        audit.notes = draft.notes;
        audit.manual_date = true;
        Ok(self.audits.insert(audit)?)
    }

    pub fn get_audit(&self, audit_id: &AuditId) -> Result<Audit, SchedulerError> {
        self.audit(audit_id)
    }

    pub fn list_audits(&self, filter: &AuditFilter) -> Result<Vec<Audit>, SchedulerError> {
        Ok(self.audits.list(filter)?)
    }

    /// Completed audits are immutable. Moving an overdue audit into the future reopens it.
    pub fn update_audit(
        &self,
        audit_id: &AuditId,
        patch: AuditPatch,
        now: DateTime<Utc>,
    ) -> Result<Audit, SchedulerError> {
        validate_notes(patch.notes.as_deref())?;

        let mut audit = self.audit(audit_id)?;
        if audit.status == AuditStatus::Completed {
            return Err(SchedulerError::AlreadyCompleted(audit.id));
        }

        if let Some(raw) = patch.assigned_to.as_deref() {
            let assignee = UserId::parse(Some(raw))?;
            self.ensure_user(&assignee)?;
            audit.assigned_to = assignee;
        }
        if let Some(scheduled_date) = patch.scheduled_date {
            audit.scheduled_date = scheduled_date;
            audit.manual_date = true;
            if audit.status == AuditStatus::Overdue && scheduled_date >= now {
                audit.status = AuditStatus::Scheduled;
            }
        }
        if patch.notes.is_some() {
            audit.notes = patch.notes;
        }

        self.audits.update(audit.clone())?;
        Ok(audit)
    }

    pub fn delete_audit(&self, audit_id: &AuditId) -> Result<(), SchedulerError> {
        if self.audits.delete(audit_id)? {
            Ok(())
        } else {
            Err(SchedulerError::AuditNotFound(*audit_id))
        }
    }

    /// Audits flagged overdue plus scheduled audits already past due but not yet swept.
    pub fn overdue_audits(&self, now: DateTime<Utc>) -> Result<Vec<Audit>, SchedulerError> {
        let mut audits = self
            .audits
            .list(&AuditFilter::with_status(AuditStatus::Overdue))?;
        audits.extend(self.audits.list(&AuditFilter {
            status: Some(AuditStatus::Scheduled),
            due_before: Some(now),
            ..AuditFilter::default()
        })?);
        audits.sort_by_key(|audit| audit.scheduled_date);
        Ok(audits)
    }

    pub fn upcoming_audits(
        &self,
        now: DateTime<Utc>,
        days: i64,
    ) -> Result<Vec<Audit>, SchedulerError> {
        Ok(self.audits.list(&AuditFilter {
            status: Some(AuditStatus::Scheduled),
            due_from: Some(now),
            due_until: Some(now + Duration::days(days.max(0))),
            ..AuditFilter::default()
        })?)
    }

    /// The company's earliest scheduled or overdue audit, if any.
    pub fn outstanding_audit(&self, company_id: &CompanyId) -> Result<Option<Audit>, SchedulerError> {
        self.earliest_outstanding(company_id, None)
    }

    fn earliest_outstanding(
        &self,
        company_id: &CompanyId,
        excluding: Option<&AuditId>,
    ) -> Result<Option<Audit>, SchedulerError> {
        Ok(self
            .audits
            .list(&AuditFilter::for_company(*company_id))?
            .into_iter()
            .filter(|audit| audit.is_outstanding())
            .find(|audit| Some(&audit.id) != excluding))
    }

    fn schedule_from(
        &self,
        company: &Company,
        assigned_to: UserId,
        now: DateTime<Utc>,
    ) -> Result<Audit, SchedulerError> {
        let cadence = AuditCadence::for_company(company.start_date, now.date_naive());
        let audit = Audit::scheduled(company.id, assigned_to, next_audit_date(cadence, now), now);
        Ok(self.audits.insert(audit)?)
    }

    fn company(&self, company_id: &CompanyId) -> Result<Company, SchedulerError> {
        self.companies
            .fetch(company_id)?
            .ok_or(SchedulerError::CompanyNotFound(*company_id))
    }

    fn audit(&self, audit_id: &AuditId) -> Result<Audit, SchedulerError> {
        self.audits
            .fetch(audit_id)?
            .ok_or(SchedulerError::AuditNotFound(*audit_id))
    }

    fn ensure_user(&self, user: &UserId) -> Result<(), SchedulerError> {
        if self.users.contains(user)? {
            Ok(())
        } else {
            Err(SchedulerError::UserNotFound(user.clone()))
        }
    }
}

/// Error raised by the audit scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("company {0} not found")]
    CompanyNotFound(CompanyId),
    #[error("audit {0} not found")]
    AuditNotFound(AuditId),
    #[error("user {0} not found")]
    UserNotFound(UserId),
    #[error(transparent)]
    Validation(#[from] AuditValidationError),
    #[error("audit {0} is already completed")]
    AlreadyCompleted(AuditId),
    #[error("company {company_id} already has outstanding audit {audit_id}")]
    OutstandingAudit {
        company_id: CompanyId,
        audit_id: AuditId,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl SchedulerError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CompanyNotFound(_)
                | Self::AuditNotFound(_)
                | Self::UserNotFound(_)
                | Self::Repository(RepositoryError::NotFound)
        )
    }
}
