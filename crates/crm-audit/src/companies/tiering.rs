use chrono::NaiveDate;

use super::domain::Tier;

pub const DEFAULT_TIER_ONE_AD_SPEND: f64 = 5_000.0;
pub const DEFAULT_NEW_COMPANY_DAYS: i64 = 60;

/// Thresholds backing the tier classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierPolicy {
    tier_one_ad_spend: f64,
    new_company_days: i64,
}

impl TierPolicy {
    pub fn new(tier_one_ad_spend: f64, new_company_days: i64) -> Self {
        let tier_one_ad_spend = if tier_one_ad_spend.is_finite() {
            tier_one_ad_spend
        } else {
            DEFAULT_TIER_ONE_AD_SPEND
        };
        let new_company_days = if new_company_days > 0 {
            new_company_days
        } else {
            DEFAULT_NEW_COMPANY_DAYS
        };

        Self {
            tier_one_ad_spend,
            new_company_days,
        }
    }

    pub fn tier_one_ad_spend(&self) -> f64 {
        self.tier_one_ad_spend
    }

    pub fn new_company_days(&self) -> i64 {
        self.new_company_days
    }

    /// First match wins: spend at or above the threshold, then age, then everyone else.
    pub fn classify(&self, start_date: NaiveDate, ad_spend: f64, today: NaiveDate) -> Tier {
        if ad_spend >= self.tier_one_ad_spend {
            Tier::Tier1
        } else if company_age_days(start_date, today) < self.new_company_days {
            Tier::Tier2
        } else {
            Tier::Tier3
        }
    }
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TIER_ONE_AD_SPEND, DEFAULT_NEW_COMPANY_DAYS)
    }
}

/// Classifies with the default thresholds.
pub fn classify_tier(start_date: NaiveDate, ad_spend: f64, today: NaiveDate) -> Tier {
    TierPolicy::default().classify(start_date, ad_spend, today)
}

pub fn company_age_days(start_date: NaiveDate, today: NaiveDate) -> i64 {
    today.signed_duration_since(start_date).num_days()
}
