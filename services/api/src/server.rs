use crate::cli::ServeArgs;
use crate::infra::{
    stores_from_import, AppState, InMemoryNotificationStore, InMemoryUserDirectory,
    InMemoryVehicleStore, StaticTokenAuthenticator,
};
use crate::mailer::SmtpNotifier;
use crate::routes::with_compliance_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use fleet_compliance::config::AppConfig;
use fleet_compliance::error::AppError;
use fleet_compliance::telemetry;
use fleet_compliance::workflows::compliance::{
    ComplianceApi, ExpiryMonitor, ExpiryScheduler, FleetImporter, SystemClock,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let (vehicles, directory) = match args.fleet_csv.take() {
        Some(path) => {
            let import = FleetImporter::from_path(&path)?;
            info!(
                path = %path.display(),
                vehicles = import.vehicles.len(),
                owners = import.contacts.len(),
                "fleet imported"
            );
            stores_from_import(import)
        }
        None => (
            InMemoryVehicleStore::default(),
            InMemoryUserDirectory::default(),
        ),
    };
    let vehicles = Arc::new(vehicles);
    let notifications = Arc::new(InMemoryNotificationStore::default());
    let windows = config.monitor.windows();

    if config.mail.api_key.is_none() {
        warn!("APP_MAIL_API_KEY is not set; reminder e-mails will not be delivered");
    }
    let monitor = ExpiryMonitor::new(
        vehicles.clone(),
        notifications.clone(),
        Arc::new(directory),
        Arc::new(SmtpNotifier::new(config.mail.clone())?),
        windows,
    );
    let clock = Arc::new(SystemClock);
    let scheduler = ExpiryScheduler::new(
        Arc::new(monitor),
        clock.clone(),
        config.monitor.scan_interval(),
    )
    .run_on_startup(config.monitor.scan_on_startup);

    let authenticator = StaticTokenAuthenticator::from_env();
    if authenticator.is_empty() {
        warn!("APP_API_TOKENS is empty; every inbox request will be rejected");
    }
    let api = Arc::new(ComplianceApi::new(
        vehicles,
        notifications,
        Arc::new(authenticator),
        clock,
        windows,
    ));

    let app = with_compliance_routes(api)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_handle = scheduler.spawn(shutdown_rx);
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        scan_interval_hours = config.monitor.scan_interval_hours,
        "fleet compliance service ready"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    readiness_flag.store(false, Ordering::Release);
    let _ = shutdown_tx.send(true);
    if let Err(err) = scheduler_handle.await {
        warn!(error = %err, "expiry scheduler did not stop cleanly");
    }
    info!("fleet compliance service stopped");

    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
