//! Audit due dates: cadence selection, scheduling, completion chaining, and overdue tracking.

pub mod cadence;
pub mod domain;
pub mod repository;
pub mod router;
pub mod scheduler;

#[cfg(test)]
mod tests;

pub use cadence::{next_audit_date, AuditCadence};
pub use domain::{
    Audit, AuditCompletion, AuditDraft, AuditFilter, AuditId, AuditPatch, AuditStatistics,
    AuditStatus, AuditValidationError, OverdueSweep, ScheduleRefresh, UserId,
};
pub use repository::{AuditRepository, UserDirectory};
pub use router::audit_router;
pub use scheduler::{AuditScheduler, SchedulerError};
