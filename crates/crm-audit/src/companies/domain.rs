use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for companies in the book of business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub Uuid);

impl CompanyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CompanyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Sales prioritization bucket derived from weekly ad spend and company age.
///
/// This is not the audit cadence; see [`crate::audits::AuditCadence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "TIER_1")]
    Tier1,
    #[serde(rename = "TIER_2")]
    Tier2,
    #[serde(rename = "TIER_3")]
    Tier3,
}

impl Tier {
    pub const fn ordered() -> [Self; 3] {
        [Self::Tier1, Self::Tier2, Self::Tier3]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Tier1 => "TIER_1",
            Self::Tier2 => "TIER_2",
            Self::Tier3 => "TIER_3",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A customer company. `tier` is a cache of the classifier output as of `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub start_date: NaiveDate,
    pub ad_spend: f64,
    pub tier: Tier,
    pub last_payment_date: Option<NaiveDate>,
    pub last_payment_amount: Option<f64>,
    pub last_meeting_date: Option<NaiveDate>,
    pub last_meeting_attendees: Vec<String>,
    pub last_meeting_duration_minutes: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Onboarding payload for a new company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyDraft {
    pub name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub ad_spend: f64,
}

impl CompanyDraft {
    pub fn validate(&self, today: NaiveDate) -> Result<(), CompanyValidationError> {
        validate_name(&self.name)?;
        validate_start_date(self.start_date, today)?;
        validate_ad_spend(self.ad_spend)?;
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub ad_spend: Option<f64>,
}

impl CompanyPatch {
    pub fn validate(&self, today: NaiveDate) -> Result<(), CompanyValidationError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(start_date) = self.start_date {
            validate_start_date(start_date, today)?;
        }
        if let Some(ad_spend) = self.ad_spend {
            validate_ad_spend(ad_spend)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }

    pub(crate) fn apply(self, company: &mut Company) {
        if let Some(name) = self.name {
            company.name = name.trim().to_string();
        }
        if let Some(contact_name) = self.contact_name {
            company.contact_name = Some(contact_name);
        }
        if let Some(email) = self.email {
            company.email = Some(email.trim().to_string());
        }
        if let Some(phone) = self.phone {
            company.phone = Some(phone);
        }
        if let Some(start_date) = self.start_date {
            company.start_date = start_date;
        }
        if let Some(ad_spend) = self.ad_spend {
            company.ad_spend = ad_spend;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub amount: f64,
    pub paid_on: NaiveDate,
}

impl PaymentRecord {
    pub fn validate(&self, today: NaiveDate) -> Result<(), CompanyValidationError> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(CompanyValidationError::InvalidPaymentAmount(self.amount));
        }
        if self.paid_on > today {
            return Err(CompanyValidationError::FutureDate {
                field: "paid_on",
                date: self.paid_on,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingRecord {
    pub held_on: NaiveDate,
    #[serde(default)]
    pub attendees: Vec<String>,
    pub duration_minutes: u32,
}

impl MeetingRecord {
    pub fn validate(&self) -> Result<(), CompanyValidationError> {
        if self.duration_minutes == 0 {
            return Err(CompanyValidationError::EmptyMeeting);
        }
        if self.attendees.iter().any(|name| name.trim().is_empty()) {
            return Err(CompanyValidationError::BlankAttendee);
        }
        Ok(())
    }
}

/// Query filter for listing companies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct CompanyFilter {
    #[serde(default)]
    pub tier: Option<Tier>,
}

impl CompanyFilter {
    pub fn matches(&self, company: &Company) -> bool {
        self.tier.map_or(true, |tier| company.tier == tier)
    }
}

/// Input validation failures for company payloads.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompanyValidationError {
    #[error("company name must not be empty")]
    EmptyName,
    #[error("{field} {date} is in the future")]
    FutureDate {
        field: &'static str,
        date: NaiveDate,
    },
    #[error("ad spend must be a finite number")]
    InvalidAdSpend,
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("payment amount must be positive (found {0})")]
    InvalidPaymentAmount(f64),
    #[error("meeting duration must be at least one minute")]
    EmptyMeeting,
    #[error("meeting attendees must not be blank")]
    BlankAttendee,
}

fn validate_name(name: &str) -> Result<(), CompanyValidationError> {
    if name.trim().is_empty() {
        return Err(CompanyValidationError::EmptyName);
    }
    Ok(())
}

fn validate_start_date(start_date: NaiveDate, today: NaiveDate) -> Result<(), CompanyValidationError> {
    if start_date > today {
        return Err(CompanyValidationError::FutureDate {
            field: "start_date",
            date: start_date,
        });
    }
    Ok(())
}

fn validate_ad_spend(ad_spend: f64) -> Result<(), CompanyValidationError> {
    if !ad_spend.is_finite() {
        return Err(CompanyValidationError::InvalidAdSpend);
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), CompanyValidationError> {
    let trimmed = email.trim();
    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(CompanyValidationError::InvalidEmail(trimmed.to_string()))
    }
}
