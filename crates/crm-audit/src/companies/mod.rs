//! Companies, their ad-spend tier, and the tracking fields the sales team maintains.

pub mod domain;
pub mod import;
pub mod repository;
pub mod router;
pub mod service;
pub mod tiering;


pub use domain::{
    Company, CompanyDraft, CompanyFilter, CompanyId, CompanyPatch, CompanyValidationError,
    MeetingRecord, PaymentRecord, Tier,
};
pub use import::{parse_company_drafts, CompanyImportError};
pub use repository::CompanyRepository;
pub use router::company_router;
pub use service::{CompanyDeletion, CompanyService, CompanyServiceError, TierRefresh};
pub use tiering::{classify_tier, company_age_days, TierPolicy};
