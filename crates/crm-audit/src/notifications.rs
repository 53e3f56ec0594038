//! Reminder generation for audit owners.
//!
//! Consumes audit state after the fact; the scheduler never calls into this module.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::audits::{Audit, AuditFilter, AuditId, AuditRepository, AuditStatus, UserId};
use crate::companies::CompanyId;
use crate::error::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    AuditOverdue,
    AuditDueSoon,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub kind: ReminderKind,
    pub audit_id: AuditId,
    pub company_id: CompanyId,
    pub recipient: UserId,
    pub scheduled_date: DateTime<Utc>,
    pub message: String,
}

/// Outbound reminder hook (e-mail, chat, or log adapters).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, reminder: Reminder) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("reminder ledger lock poisoned")]
    LedgerPoisoned,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

type ReminderKey = (AuditId, ReminderKind, DateTime<Utc>);

/// Reminders already published, so repeated sweeps notify each audit once per state.
///
/// An entry is dropped once its audit stops qualifying for that reminder, which lets a
/// rescheduled or reopened audit be reminded again.
#[derive(Debug, Default)]
pub struct ReminderLedger {
    sent: Mutex<HashSet<ReminderKey>>,
}

impl ReminderLedger {
    /// Forgets reminders that no longer apply and returns those not yet published.
    pub fn pending(&self, reminders: Vec<Reminder>) -> Result<Vec<Reminder>, NotificationError> {
        let mut sent = self.lock()?;
        let current: HashSet<ReminderKey> = reminders.iter().map(reminder_key).collect();
        sent.retain(|key| current.contains(key));

        Ok(reminders
            .into_iter()
            .filter(|reminder| !sent.contains(&reminder_key(reminder)))
            .collect())
    }

    pub fn record(&self, reminder: &Reminder) -> Result<(), NotificationError> {
        self.lock()?.insert(reminder_key(reminder));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|sent| sent.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashSet<ReminderKey>>, NotificationError> {
        self.sent
            .lock()
            .map_err(|_| NotificationError::LedgerPoisoned)
    }
}

fn reminder_key(reminder: &Reminder) -> ReminderKey {
    (reminder.audit_id, reminder.kind, reminder.scheduled_date)
}

/// One reminder per overdue audit, and one per scheduled audit due within `horizon_days`.
pub fn collect_reminders(audits: &[Audit], now: DateTime<Utc>, horizon_days: i64) -> Vec<Reminder> {
    let horizon = now + Duration::days(horizon_days.max(0));

    audits
        .iter()
        .filter_map(|audit| {
            let kind = match audit.status {
                AuditStatus::Overdue => ReminderKind::AuditOverdue,
                AuditStatus::Scheduled
                    if audit.scheduled_date >= now && audit.scheduled_date <= horizon =>
                {
                    ReminderKind::AuditDueSoon
                }
                _ => return None,
            };
            Some(reminder_for(audit, kind, now))
        })
        .collect()
}

fn reminder_for(audit: &Audit, kind: ReminderKind, now: DateTime<Utc>) -> Reminder {
    let message = match kind {
        ReminderKind::AuditOverdue => {
            let days_late = (now - audit.scheduled_date).num_days();
            format!(
                "audit {} was due {} ({} day(s) ago)",
                audit.id,
                audit.scheduled_date.format("%Y-%m-%d"),
                days_late
            )
        }
        ReminderKind::AuditDueSoon => format!(
            "audit {} is due {}",
            audit.id,
            audit.scheduled_date.format("%Y-%m-%d")
        ),
    };

    Reminder {
        kind,
        audit_id: audit.id,
        company_id: audit.company_id,
        recipient: audit.assigned_to.clone(),
        scheduled_date: audit.scheduled_date,
        message,
    }
}

/// Polls outstanding audits and publishes the reminders the ledger has not seen,
/// returning how many were sent.
pub fn dispatch_reminders<A, P>(
    audits: &A,
    publisher: &P,
    ledger: &ReminderLedger,
    now: DateTime<Utc>,
    horizon_days: i64,
) -> Result<usize, NotificationError>
where
    A: AuditRepository + ?Sized,
    P: NotificationPublisher + ?Sized,
{
    let mut outstanding = audits.list(&AuditFilter::with_status(AuditStatus::Overdue))?;
    outstanding.extend(audits.list(&AuditFilter::with_status(AuditStatus::Scheduled))?);

    let reminders = ledger.pending(collect_reminders(&outstanding, now, horizon_days))?;
    let sent = reminders.len();
    for reminder in reminders {
        publisher.publish(reminder.clone())?;
        ledger.record(&reminder)?;
    }
    Ok(sent)
}
