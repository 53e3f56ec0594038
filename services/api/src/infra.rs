use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use crm_audit::audits::{next_audit_date, AuditCadence};
use crm_audit::cache::MokaResponseCache;
use crm_audit::companies::{company_age_days, Tier, TierPolicy};
use crm_audit::config::AppConfig;
use crm_audit::memory::{InMemoryAuditRepository, InMemoryCompanyRepository, StaticUserDirectory};
use crm_audit::notifications::{
    dispatch_reminders, NotificationError, NotificationPublisher, Reminder, ReminderLedger,
};
use crm_audit::CrmState;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) type MemoryCrmState =
    CrmState<InMemoryCompanyRepository, InMemoryAuditRepository, StaticUserDirectory>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) tier_policy: TierPolicy,
}

/// Wires the in-memory repositories, the configured auditors, and the response cache.
///
/// The audit repository is returned alongside the state for the reminder sweep.
pub(crate) fn memory_state(config: &AppConfig) -> (Arc<MemoryCrmState>, Arc<InMemoryAuditRepository>) {
    let companies = Arc::new(InMemoryCompanyRepository::default());
    let audits = Arc::new(InMemoryAuditRepository::default());
    let users = Arc::new(StaticUserDirectory::new(
        config.scheduling.auditors.iter().cloned(),
    ));
    let cache = Arc::new(MokaResponseCache::new(&config.cache));

    let state = Arc::new(CrmState::new(
        companies,
        audits.clone(),
        users,
        tier_policy(config),
        cache,
    ));
    (state, audits)
}

pub(crate) fn tier_policy(config: &AppConfig) -> TierPolicy {
    TierPolicy::new(
        config.scheduling.tier_one_ad_spend,
        config.scheduling.new_company_days,
    )
}

/// Publishes reminders to the log until a real transport is wired in.
#[derive(Debug, Default, Clone)]
pub(crate) struct LogNotificationPublisher;

impl NotificationPublisher for LogNotificationPublisher {
    fn publish(&self, reminder: Reminder) -> Result<(), NotificationError> {
        info!(
            kind = ?reminder.kind,
            audit_id = %reminder.audit_id,
            company_id = %reminder.company_id,
            recipient = %reminder.recipient,
            "{}",
            reminder.message
        );
        Ok(())
    }
}

/// One pass of the background job: flag overdue audits, then remind their owners.
///
/// The ledger carries across passes so an audit is not reminded on every tick.
pub(crate) fn sweep_once<P>(
    state: &MemoryCrmState,
    audits: &InMemoryAuditRepository,
    publisher: &P,
    ledger: &ReminderLedger,
    horizon_days: i64,
    now: DateTime<Utc>,
) where
    P: NotificationPublisher + ?Sized,
{
    match state.audits.process_overdue_audits(now) {
        Ok(sweep) if sweep.marked_count > 0 => state.cache.invalidate_all(),
        Ok(_) => {}
        Err(err) => warn!(error = %err, "overdue sweep failed"),
    }

    match dispatch_reminders(audits, publisher, ledger, now, horizon_days) {
        Ok(sent) if sent > 0 => info!(sent, "audit reminders dispatched"),
        Ok(_) => {}
        Err(err) => warn!(error = %err, "reminder dispatch failed"),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ClassificationPreview {
    pub(crate) start_date: NaiveDate,
    pub(crate) ad_spend: f64,
    pub(crate) age_days: i64,
    pub(crate) tier: Tier,
    pub(crate) cadence: AuditCadence,
    pub(crate) next_audit_date: DateTime<Utc>,
}

/// Tier and cadence for a prospective company, with its first audit counted from `now`.
pub(crate) fn classify_preview(
    policy: &TierPolicy,
    start_date: NaiveDate,
    ad_spend: f64,
    now: DateTime<Utc>,
) -> ClassificationPreview {
    let today = now.date_naive();
    let cadence = AuditCadence::for_company(start_date, today);
    ClassificationPreview {
        start_date,
        ad_spend,
        age_days: company_age_days(start_date, today),
        tier: policy.classify(start_date, ad_spend, today),
        cadence,
        next_audit_date: next_audit_date(cadence, now),
    }
}

/// The pinned date, else today's UTC calendar date, matching what the scheduler sees.
pub(crate) fn resolve_today(pinned: Option<NaiveDate>) -> NaiveDate {
    pinned.unwrap_or_else(|| Utc::now().date_naive())
}

/// Midnight UTC on `date`, used when a caller pins "today" to a calendar day.
pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}
