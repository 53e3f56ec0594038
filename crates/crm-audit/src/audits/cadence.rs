use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// How often a company is audited, chosen from its age alone.
///
/// Independent of the ad-spend [`Tier`](crate::companies::Tier): a low-spend
/// company in its first quarter is still audited weekly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCadence {
    Weekly,
    Monthly,
    Quarterly,
}

impl AuditCadence {
    pub const fn days(self) -> i64 {
        match self {
            Self::Weekly => 7,
            Self::Monthly => 30,
            Self::Quarterly => 90,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Quarterly => "Quarterly",
        }
    }

    /// Under three calendar months: weekly. Up to and including twelve: monthly. Beyond: quarterly.
    pub fn for_company(start_date: NaiveDate, today: NaiveDate) -> Self {
        let three_months = months_after(start_date, 3);
        let twelve_months = months_after(start_date, 12);

        if today < three_months {
            Self::Weekly
        } else if today <= twelve_months {
            Self::Monthly
        } else {
            Self::Quarterly
        }
    }
}

fn months_after(start_date: NaiveDate, months: u32) -> NaiveDate {
    start_date
        .checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

pub fn next_audit_date(cadence: AuditCadence, from: DateTime<Utc>) -> DateTime<Utc> {
    from + Duration::days(cadence.days())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 15).expect("valid date")
    }

    #[test]
    fn new_company_is_audited_weekly() {
        let founded = today() - Duration::days(10);
        assert_eq!(AuditCadence::for_company(founded, today()), AuditCadence::Weekly);
    }

    #[test]
    fn mid_age_company_is_audited_monthly() {
        let founded = today() - Duration::days(200);
        assert_eq!(AuditCadence::for_company(founded, today()), AuditCadence::Monthly);
    }

    #[test]
    fn long_tenured_company_is_audited_quarterly() {
        let founded = today() - Duration::days(400);
        assert_eq!(
            AuditCadence::for_company(founded, today()),
            AuditCadence::Quarterly
        );
    }

    #[test]
    fn bracket_boundaries_use_calendar_months() {
        let founded = NaiveDate::from_ymd_opt(2025, 1, 31).expect("valid date");
        let day_before_three = NaiveDate::from_ymd_opt(2025, 4, 29).expect("valid date");
        let three_months = NaiveDate::from_ymd_opt(2025, 4, 30).expect("valid date");
        let twelve_months = NaiveDate::from_ymd_opt(2026, 1, 31).expect("valid date");
        let after_twelve = NaiveDate::from_ymd_opt(2026, 2, 1).expect("valid date");

        assert_eq!(
            AuditCadence::for_company(founded, day_before_three),
            AuditCadence::Weekly
        );
        assert_eq!(
            AuditCadence::for_company(founded, three_months),
            AuditCadence::Monthly
        );
        assert_eq!(
            AuditCadence::for_company(founded, twelve_months),
            AuditCadence::Monthly
        );
        assert_eq!(
            AuditCadence::for_company(founded, after_twelve),
            AuditCadence::Quarterly
        );
    }

    #[test]
    fn next_audit_date_adds_exact_cadence() {
        let from = Utc.with_ymd_and_hms(2025, 10, 15, 9, 30, 0).single().expect("valid");
        assert_eq!(
            next_audit_date(AuditCadence::Weekly, from),
            Utc.with_ymd_and_hms(2025, 10, 22, 9, 30, 0).single().expect("valid")
        );
        assert_eq!(
            next_audit_date(AuditCadence::Monthly, from) - from,
            Duration::days(30)
        );
        assert_eq!(
            next_audit_date(AuditCadence::Quarterly, from) - from,
            Duration::days(90)
        );
    }
}
