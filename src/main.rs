use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::Extension;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum_prometheus::PrometheusMetricLayer;
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};
use crm_tiering::config::AppConfig;
use crm_tiering::error::AppError;
use crm_tiering::telemetry;
use crm_tiering::workflows::tiering::{
    tier_router, Company, CompanyId, NewTierChangeLog, NotificationDispatcher, NotifyError,
    StoreError, Tier, TierChangeLog, TierNotification, TierQueryService, TierStore,
    TierWorkflowError, TierWorkflowService, UserAccount, UserId, UserRole,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tracing::info;

#[derive(Clone)]
struct OpsState {
    readiness: Arc<AtomicBool>,
    metrics: Arc<PrometheusHandle>,
}

#[derive(Parser, Debug)]
#[command(
    name = "CRM Tier Service",
    about = "Run the client tier classification and change-audit workflow service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect and exercise the tier workflow against seeded demo data
    Tier {
        #[command(subcommand)]
        command: TierCommand,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum TierCommand {
    /// Print review candidates and distribution statistics
    Report,
    /// Apply the classifier to every company and print the changes
    Recompute,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Tier {
            command: TierCommand::Report,
        } => run_tier_report(),
        Command::Tier {
            command: TierCommand::Recompute,
        } => run_tier_recompute(),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let ops_state = OpsState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(seeded_store());
    let notifier = Arc::new(LoggingNotifier::default());
    let workflow = Arc::new(TierWorkflowService::new(store.clone(), notifier));
    let query = Arc::new(TierQueryService::new(store));

    let app = tier_router(workflow, query)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .layer(Extension(ops_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "tier workflow service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_tier_report() -> Result<(), AppError> {
    let store = Arc::new(seeded_store());
    let query = TierQueryService::new(store);

    let candidates = query
        .companies_needing_review()
        .map_err(TierWorkflowError::from)?;
    let statistics = query.tier_statistics().map_err(TierWorkflowError::from)?;

    println!("Tier review report");
    if candidates.is_empty() {
        println!("\nReview candidates: none");
    } else {
        println!("\nReview candidates");
        for candidate in &candidates {
            println!(
                "- {} ({}): {} -> {} ({})",
                candidate.name,
                candidate.id.0,
                candidate.tier.label(),
                candidate.suggested_tier.label(),
                candidate.reason
            );
        }
    }

    println!("\nDistribution");
    println!("- TIER_1: {}", statistics.distribution.tier_1);
    println!("- TIER_2: {}", statistics.distribution.tier_2);
    println!("- TIER_3: {}", statistics.distribution.tier_3);
    println!(
        "\n{} companies, {} changes in the last 7 days",
        statistics.total_companies, statistics.recent_changes
    );

    Ok(())
}

fn run_tier_recompute() -> Result<(), AppError> {
    let store = Arc::new(seeded_store());
    let notifier = Arc::new(LoggingNotifier::default());
    let workflow = TierWorkflowService::new(store, notifier);

    let summary = workflow.recompute_all()?;

    println!(
        "Recomputed {} companies, {} updated",
        summary.total_companies, summary.updated_count
    );
    for change in &summary.changes {
        println!(
            "- {} ({}): {} -> {}",
            change.company_name,
            change.company_id.0,
            change.old_tier.label(),
            change.new_tier.label()
        );
    }

    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(Extension(state): Extension<OpsState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(Extension(state): Extension<OpsState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Document-store stand-in backed by process memory. Companies iterate in
/// key order, which doubles as the store's "list all" order.
#[derive(Default)]
struct InMemoryTierStore {
    companies: Mutex<BTreeMap<String, Company>>,
    users: Mutex<HashMap<String, UserAccount>>,
    logs: Mutex<Vec<TierChangeLog>>,
    log_sequence: AtomicU64,
}

impl InMemoryTierStore {
    fn insert_company(&self, company: Company) {
        let mut guard = self.companies.lock().expect("company mutex poisoned");
        guard.insert(company.id.0.clone(), company);
    }

    fn insert_user(&self, user: UserAccount) {
        let mut guard = self.users.lock().expect("user mutex poisoned");
        guard.insert(user.id.0.clone(), user);
    }
}

impl TierStore for InMemoryTierStore {
    fn find_companies(&self) -> Result<Vec<Company>, StoreError> {
        let guard = self.companies.lock().expect("company mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn find_company_by_id(&self, id: &CompanyId) -> Result<Option<Company>, StoreError> {
        let guard = self.companies.lock().expect("company mutex poisoned");
        Ok(guard.get(&id.0).cloned())
    }

    fn update_company_tier(&self, id: &CompanyId, tier: Tier) -> Result<Company, StoreError> {
        let mut guard = self.companies.lock().expect("company mutex poisoned");
        let company = guard.get_mut(&id.0).ok_or(StoreError::NotFound)?;
        company.tier = tier;
        Ok(company.clone())
    }

    fn find_user_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, StoreError> {
        let guard = self.users.lock().expect("user mutex poisoned");
        Ok(guard.get(&id.0).cloned())
    }

    fn create_log(&self, entry: NewTierChangeLog) -> Result<TierChangeLog, StoreError> {
        let sequence = self.log_sequence.fetch_add(1, Ordering::Relaxed);
        let log = TierChangeLog {
            id: format!("log-{sequence:06}"),
            company_id: entry.company_id,
            old_tier: entry.old_tier,
            new_tier: entry.new_tier,
            reason: entry.reason,
            changed_by: entry.changed_by,
            notes: entry.notes,
            created_at: Utc::now(),
        };
        let mut guard = self.logs.lock().expect("log mutex poisoned");
        guard.push(log.clone());
        Ok(log)
    }

    fn find_logs_for_company(&self, id: &CompanyId) -> Result<Vec<TierChangeLog>, StoreError> {
        let guard = self.logs.lock().expect("log mutex poisoned");
        Ok(guard
            .iter()
            .filter(|log| log.company_id == *id)
            .cloned()
            .collect())
    }

    fn count_logs_since(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let guard = self.logs.lock().expect("log mutex poisoned");
        Ok(guard.iter().filter(|log| log.created_at >= cutoff).count() as u64)
    }
}

/// Notification stand-in: records the payload and emits a log line in place
/// of a delivery queue.
#[derive(Default)]
struct LoggingNotifier {
    sent: Mutex<Vec<TierNotification>>,
}

impl LoggingNotifier {
    fn queued(&self) -> usize {
        self.sent.lock().expect("notification mutex poisoned").len()
    }
}

impl NotificationDispatcher for LoggingNotifier {
    fn notify(&self, notification: TierNotification) -> Result<(), NotifyError> {
        info!(
            recipient = %notification.user_id.0,
            title = %notification.title,
            "notification queued"
        );
        self.sent
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

/// Demo dataset: one aligned company and three whose cached tier has drifted
/// from the classifier, so the report and recompute commands have something
/// to show.
fn seeded_store() -> InMemoryTierStore {
    let store = InMemoryTierStore::default();
    let now = Utc::now();

    store.insert_user(UserAccount {
        id: UserId("user-ceo".to_string()),
        username: "harriet".to_string(),
        role: UserRole::Ceo,
    });
    store.insert_user(UserAccount {
        id: UserId("user-manager".to_string()),
        username: "devon".to_string(),
        role: UserRole::Manager,
    });
    store.insert_user(UserAccount {
        id: UserId("user-account-rep".to_string()),
        username: "sam".to_string(),
        role: UserRole::TeamMember,
    });

    store.insert_company(Company {
        id: CompanyId("company-aster".to_string()),
        name: "Aster Logistics".to_string(),
        start_date: now - Duration::days(400),
        ad_spend: 6000.0,
        tier: Tier::Tier2,
        created_by: UserId("user-account-rep".to_string()),
    });
    store.insert_company(Company {
        id: CompanyId("company-birch".to_string()),
        name: "Birch Media".to_string(),
        start_date: now - Duration::days(10),
        ad_spend: 50_000.0,
        tier: Tier::Tier1,
        created_by: UserId("user-manager".to_string()),
    });
    store.insert_company(Company {
        id: CompanyId("company-cedar".to_string()),
        name: "Cedar Analytics".to_string(),
        start_date: now - Duration::days(200),
        ad_spend: 1000.0,
        tier: Tier::Tier3,
        created_by: UserId("user-account-rep".to_string()),
    });
    store.insert_company(Company {
        id: CompanyId("company-dogwood".to_string()),
        name: "Dogwood Retail".to_string(),
        start_date: now - Duration::days(120),
        ad_spend: 2500.0,
        tier: Tier::Tier1,
        created_by: UserId("user-ceo".to_string()),
    });

    store
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_store_reports_drifted_companies() {
        let store = Arc::new(seeded_store());
        let query = TierQueryService::new(store);

        let candidates = query.companies_needing_review().expect("review runs");
        let names: Vec<&str> = candidates
            .iter()
            .map(|candidate| candidate.name.as_str())
            .collect();

        assert_eq!(
            names,
            vec!["Aster Logistics", "Birch Media", "Dogwood Retail"]
        );
    }

    #[test]
    fn recompute_aligns_seeded_store() {
        let store = Arc::new(seeded_store());
        let notifier = Arc::new(LoggingNotifier::default());
        let workflow = TierWorkflowService::new(store.clone(), notifier.clone());

        let summary = workflow.recompute_all().expect("recompute runs");
        assert_eq!(summary.total_companies, 4);
        assert_eq!(summary.updated_count, 3);
        assert_eq!(notifier.queued(), 3);

        let query = TierQueryService::new(store);
        assert!(query
            .companies_needing_review()
            .expect("review runs")
            .is_empty());
    }
}
