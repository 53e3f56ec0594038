use crate::cli::ServeArgs;
use crate::infra::{
    memory_state, sweep_once, tier_policy, AppState, LogNotificationPublisher, MemoryCrmState,
};
use crate::routes::with_crm_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use crm_audit::config::{AppConfig, SchedulingConfig};
use crm_audit::error::AppError;
use crm_audit::memory::InMemoryAuditRepository;
use crm_audit::notifications::ReminderLedger;
use crm_audit::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        tier_policy: tier_policy(&config),
    };

    let (crm_state, audits) = memory_state(&config);
    let sweeper = spawn_overdue_sweep(crm_state.clone(), audits, &config.scheduling);

    let app = with_crm_routes(crm_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        auditors = config.scheduling.auditors.len(),
        "crm audit scheduler ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    readiness_flag.store(false, Ordering::Release);
    if let Some(handle) = sweeper {
        handle.abort();
    }
    info!("crm audit scheduler stopped");
    Ok(())
}

fn spawn_overdue_sweep(
    state: Arc<MemoryCrmState>,
    audits: Arc<InMemoryAuditRepository>,
    scheduling: &SchedulingConfig,
) -> Option<JoinHandle<()>> {
    let period = scheduling.overdue_sweep_interval;
    if period.is_zero() {
        info!("overdue sweep disabled");
        return None;
    }
    let horizon_days = scheduling.reminder_horizon_days;

    Some(tokio::spawn(async move {
        let publisher = LogNotificationPublisher;
        let ledger = ReminderLedger::default();
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            sweep_once(&state, &audits, &publisher, &ledger, horizon_days, Utc::now());
        }
    }))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => {
            warn!(error = %err, "unable to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
