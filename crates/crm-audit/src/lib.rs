//! Company tiering and audit scheduling for the CRM back end.

pub mod audits;
pub mod cache;
pub mod companies;
pub mod config;
pub mod error;
pub mod memory;
pub mod notifications;
pub mod state;
pub mod telemetry;

pub use state::{crm_router, CrmState};
