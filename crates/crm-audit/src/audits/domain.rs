use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::companies::CompanyId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditId(pub Uuid);

impl AuditId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuditId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity of a CRM user who can own audits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Trims the raw value and rejects blanks.
    pub fn parse(raw: Option<&str>) -> Result<Self, AuditValidationError> {
        match raw.map(str::trim) {
            Some(value) if !value.is_empty() => Ok(Self(value.to_string())),
            _ => Err(AuditValidationError::MissingAssignee),
        }
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Scheduled,
    Completed,
    Overdue,
}

impl AuditStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Completed => "COMPLETED",
            Self::Overdue => "OVERDUE",
        }
    }

    /// Scheduled and overdue audits still need to happen.
    pub const fn is_outstanding(self) -> bool {
        matches!(self, Self::Scheduled | Self::Overdue)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    pub id: AuditId,
    pub company_id: CompanyId,
    pub scheduled_date: DateTime<Utc>,
    pub assigned_to: UserId,
    pub status: AuditStatus,
    pub completed_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    /// Anchor the due date was computed from.
    pub created_at: DateTime<Utc>,
    /// The due date was picked by a user rather than derived from the cadence.
    #[serde(default)]
    pub manual_date: bool,
}

impl Audit {
    pub fn scheduled(
        company_id: CompanyId,
        assigned_to: UserId,
        scheduled_date: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditId::new(),
            company_id,
            scheduled_date,
            assigned_to,
            status: AuditStatus::Scheduled,
            completed_date: None,
            notes: None,
            created_at,
            manual_date: false,
        }
    }

    pub fn is_outstanding(&self) -> bool {
        self.status.is_outstanding()
    }
}

/// Manually scheduled audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditDraft {
    pub company_id: CompanyId,
    pub scheduled_date: DateTime<Utc>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Reschedule, reassign, or annotate an outstanding audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditPatch {
    #[serde(default)]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Repository-level query. Date bounds: `due_before` is exclusive, the others inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub company_id: Option<CompanyId>,
    pub status: Option<AuditStatus>,
    pub due_before: Option<DateTime<Utc>>,
    pub due_from: Option<DateTime<Utc>>,
    pub due_until: Option<DateTime<Utc>>,
}

impl AuditFilter {
    pub fn for_company(company_id: CompanyId) -> Self {
        Self {
            company_id: Some(company_id),
            ..Self::default()
        }
    }

    pub fn with_status(status: AuditStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn matches(&self, audit: &Audit) -> bool {
        self.company_id.map_or(true, |id| audit.company_id == id)
            && self.status.map_or(true, |status| audit.status == status)
            && self
                .due_before
                .map_or(true, |bound| audit.scheduled_date < bound)
            && self
                .due_from
                .map_or(true, |bound| audit.scheduled_date >= bound)
            && self
                .due_until
                .map_or(true, |bound| audit.scheduled_date <= bound)
    }
}

/// Result of completing an audit: the closed audit and the one now outstanding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditCompletion {
    pub completed: Audit,
    pub successor: Audit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverdueSweep {
    pub marked_count: usize,
    pub audits: Vec<Audit>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleRefresh {
    pub updated: usize,
    pub created: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditStatistics {
    pub total: usize,
    pub completed: usize,
    pub scheduled: usize,
    pub overdue: usize,
    pub upcoming_week: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuditValidationError {
    #[error("assigned_to is required")]
    MissingAssignee,
    #[error("notes must not exceed {max} characters")]
    NotesTooLong { max: usize },
}

pub(crate) const MAX_NOTES_LEN: usize = 4_000;

pub(crate) fn validate_notes(notes: Option<&str>) -> Result<(), AuditValidationError> {
    match notes {
        Some(text) if text.chars().count() > MAX_NOTES_LEN => {
            Err(AuditValidationError::NotesTooLong { max: MAX_NOTES_LEN })
        }
        _ => Ok(()),
    }
}
