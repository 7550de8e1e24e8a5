use crate::infra::{
    parse_instant, stores_from_import, DryRunNotifier, InMemoryNotificationStore,
    InMemoryUserDirectory, InMemoryVehicleStore,
};
use crate::mailer::SmtpNotifier;
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use fleet_compliance::config::AppConfig;
use fleet_compliance::error::AppError;
use fleet_compliance::workflows::compliance::{
    days_left, summarize, Clock, DashboardStats, ExpiryMonitor, ExpiryStatus, ExpiryWindows,
    FleetImporter, ManualClock, Notifier, ScanReport, UserId, Vehicle,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScanArgs {
    /// Fleet CSV export to scan
    #[arg(long)]
    pub(crate) fleet_csv: PathBuf,
    /// Scan time (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = parse_instant)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Number of consecutive scans to replay (1-1000)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub(crate) runs: u32,
    /// Days the clock advances between scans (0-3650)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(i64).range(0..=3650))]
    pub(crate) step_days: i64,
    /// Deliver reminders over SMTP instead of only printing them
    #[arg(long)]
    pub(crate) send: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DashboardArgs {
    /// Fleet CSV export holding the owner's vehicles
    #[arg(long)]
    pub(crate) fleet_csv: PathBuf,
    /// Owner whose fleet is summarised
    #[arg(long)]
    pub(crate) user: String,
    /// Evaluation time (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = parse_instant)]
    pub(crate) now: Option<DateTime<Utc>>,
}

pub(crate) fn run_scan(args: ScanArgs) -> Result<(), AppError> {
    let ScanArgs {
        fleet_csv,
        now,
        runs,
        step_days,
        send,
    } = args;

    let config = AppConfig::load()?;
    let import = FleetImporter::from_path(&fleet_csv)?;
    let (vehicles, directory) = stores_from_import(import);
    let replay = ScanReplay {
        windows: config.monitor.windows(),
        start: now.unwrap_or_else(Utc::now),
        runs,
        step: Duration::days(step_days),
    };

    println!("Expiry scan replay for {}", fleet_csv.display());
    if send {
        let notifier = Arc::new(SmtpNotifier::new(config.mail.clone())?);
        let stored = replay.run(vehicles, directory, notifier)?;
        println!("\n{stored} reminder(s) stored; e-mails were sent over SMTP");
        return Ok(());
    }

    let notifier = Arc::new(DryRunNotifier::new(config.mail.clone()));
    let stored = replay.run(vehicles, directory, notifier.clone())?;
    let composed = notifier.composed();
    println!(
        "\n{} reminder(s) stored | {} e-mail(s) composed (dry run, pass --send to deliver)",
        stored,
        composed.len()
    );
    if composed.is_empty() && config.mail.api_key.is_none() {
        println!("Mail delivery is disabled: set APP_MAIL_API_KEY to compose reminder e-mails.");
    }
    for mail in composed {
        println!("  - to {} | {} | {}", mail.to, mail.subject, mail.html_body);
    }

    Ok(())
}

struct ScanReplay {
    windows: ExpiryWindows,
    start: DateTime<Utc>,
    runs: u32,
    step: Duration,
}

impl ScanReplay {
    /// Returns how many reminder records the replay stored.
    fn run<S>(
        &self,
        vehicles: InMemoryVehicleStore,
        directory: InMemoryUserDirectory,
        notifier: Arc<S>,
    ) -> Result<usize, AppError>
    where
        S: Notifier + 'static,
    {
        let notifications = Arc::new(InMemoryNotificationStore::default());
        let monitor = ExpiryMonitor::new(
            Arc::new(vehicles),
            notifications.clone(),
            Arc::new(directory),
            notifier,
            self.windows,
        );
        let clock = ManualClock::new(self.start);

        for run in 1..=self.runs {
            let scanned_at = clock.now();
            let report = monitor.scan(scanned_at)?;
            render_scan(run, scanned_at, &report);
            clock.advance(self.step);
        }

        Ok(notifications.records().len())
    }
}

fn render_scan(run: u32, scanned_at: DateTime<Utc>, report: &ScanReport) {
    println!("\nScan {} at {}", run, scanned_at.to_rfc3339());
    println!(
        "- {} vehicles scanned | {} skipped without a contact",
        report.vehicles_scanned, report.vehicles_skipped
    );
    println!(
        "- {} reminders created | {} suppressed by cool-down",
        report.reminders_created, report.duplicates_suppressed
    );
    if report.delivery_failures > 0 || report.store_failures > 0 {
        println!(
            "- {} delivery failures | {} store failures",
            report.delivery_failures, report.store_failures
        );
    }
    for record in &report.created {
        println!("  - {}: {}", record.title, record.message);
    }
}

pub(crate) fn run_dashboard(args: DashboardArgs) -> Result<(), AppError> {
    let DashboardArgs {
        fleet_csv,
        user,
        now,
    } = args;

    let config = AppConfig::load()?;
    let windows = config.monitor.windows();
    let now = now.unwrap_or_else(Utc::now);
    let user_id = UserId(user);
    let import = FleetImporter::from_path(&fleet_csv)?;
    let fleet: Vec<Vehicle> = import
        .vehicles
        .into_iter()
        .filter(|vehicle| vehicle.user_id == user_id)
        .collect();

    let stats = summarize(&fleet, now, &windows);
    render_dashboard(&user_id, now, &stats);
    render_attention_list(&fleet, now, &windows);

    Ok(())
}

fn render_dashboard(user_id: &UserId, now: DateTime<Utc>, stats: &DashboardStats) {
    println!("Fleet dashboard for {} at {}", user_id, now.to_rfc3339());
    println!("- {} vehicles", stats.total_vehicles);
    println!("- {} documents expiring soon", stats.expiring_this_month);
    println!(
        "- {} overdue (road tax {} | insurance {} | PUC {})",
        stats.overdue.total(),
        stats.overdue.road_tax,
        stats.overdue.insurance,
        stats.overdue.puc
    );
}

fn render_attention_list(fleet: &[Vehicle], now: DateTime<Utc>, windows: &ExpiryWindows) {
    let mut rows: Vec<_> = fleet
        .iter()
        .flat_map(|vehicle| {
            vehicle
                .tracked_expiries()
                .map(move |(document, expiry)| (vehicle, document, expiry))
        })
        .filter(|(_, _, expiry)| windows.classify(*expiry, now) != ExpiryStatus::Later)
        .collect();
    if rows.is_empty() {
        return;
    }

    rows.sort_by_key(|(_, _, expiry)| *expiry);
    println!("Needs attention:");
    for (vehicle, document, expiry) in rows {
        let remaining = days_left(expiry, now);
        let when = if remaining < 0 {
            format!("lapsed {} day(s) ago", -remaining)
        } else {
            format!("{remaining} day(s) left")
        };
        println!(
            "  - {} {}: {} ({})",
            vehicle.registration_number,
            document.label(),
            expiry.date_naive(),
            when
        );
    }
}
