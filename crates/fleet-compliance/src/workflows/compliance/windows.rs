use chrono::{DateTime, Duration, Utc};

pub const REMINDER_WINDOW_DAYS: i64 = 15;
pub const COOL_DOWN_DAYS: i64 = 7;
pub const DASHBOARD_HORIZON_DAYS: i64 = 30;

/// Where an expiry sits relative to the dashboard horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStatus {
    Overdue,
    ExpiringSoon,
    Later,
}

/// Time windows shared by the expiry monitor and the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryWindows {
    reminder: Duration,
    cool_down: Duration,
    horizon: Duration,
}

impl ExpiryWindows {
    /// Day counts beyond what [`Duration`] can hold saturate.
    pub fn new(reminder_days: i64, cool_down_days: i64, horizon_days: i64) -> Self {
        Self {
            reminder: saturating_days(reminder_days),
            cool_down: saturating_days(cool_down_days),
            horizon: saturating_days(horizon_days),
        }
    }

    pub fn reminder(&self) -> Duration {
        self.reminder
    }

    pub fn cool_down(&self) -> Duration {
        self.cool_down
    }

    pub fn horizon(&self) -> Duration {
        self.horizon
    }

    /// `now < expiry <= now + reminder`. Lapsed documents are never reminded.
    pub fn is_due_for_reminder(&self, expiry: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now < expiry && within(expiry, now, self.reminder)
    }

    /// Reminders created at or after this instant suppress a new one.
    pub fn dedup_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.cool_down)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn classify(&self, expiry: DateTime<Utc>, now: DateTime<Utc>) -> ExpiryStatus {
        if expiry < now {
            ExpiryStatus::Overdue
        } else if within(expiry, now, self.horizon) {
            ExpiryStatus::ExpiringSoon
        } else {
            ExpiryStatus::Later
        }
    }
}

fn saturating_days(days: i64) -> Duration {
    Duration::try_days(days).unwrap_or(if days < 0 { Duration::MIN } else { Duration::MAX })
}

/// `expiry <= now + window`, treating a limit past the calendar's end as unbounded.
fn within(expiry: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    now.checked_add_signed(window)
        .map_or(true, |limit| expiry <= limit)
}

impl Default for ExpiryWindows {
    fn default() -> Self {
        Self::new(REMINDER_WINDOW_DAYS, COOL_DOWN_DAYS, DASHBOARD_HORIZON_DAYS)
    }
}

/// Whole days remaining until `expiry`, rounded down.
pub fn days_left(expiry: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expiry - now).num_seconds().div_euclid(86_400)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn reminder_window_is_inclusive_at_fifteen_days() {
        let windows = ExpiryWindows::default();
        let boundary = now() + Duration::days(15);

        assert!(windows.is_due_for_reminder(boundary, now()));
        assert!(!windows.is_due_for_reminder(boundary + Duration::seconds(1), now()));
    }

    #[test]
    fn reminder_window_excludes_now_and_the_past() {
        let windows = ExpiryWindows::default();

        assert!(!windows.is_due_for_reminder(now(), now()));
        assert!(!windows.is_due_for_reminder(now() - Duration::days(1), now()));
        assert!(windows.is_due_for_reminder(now() + Duration::seconds(1), now()));
    }

    #[test]
    fn classify_splits_overdue_soon_and_later() {
        let windows = ExpiryWindows::default();

        assert_eq!(
            windows.classify(now() - Duration::seconds(1), now()),
            ExpiryStatus::Overdue
        );
        assert_eq!(windows.classify(now(), now()), ExpiryStatus::ExpiringSoon);
        assert_eq!(
            windows.classify(now() + Duration::days(30), now()),
            ExpiryStatus::ExpiringSoon
        );
        assert_eq!(
            windows.classify(now() + Duration::days(30) + Duration::seconds(1), now()),
            ExpiryStatus::Later
        );
    }

    #[test]
    fn dedup_cutoff_looks_back_one_cool_down() {
        let windows = ExpiryWindows::default();
        assert_eq!(windows.dedup_cutoff(now()), now() - Duration::days(7));
    }

    #[test]
    fn days_left_rounds_down() {
        assert_eq!(days_left(now() + Duration::hours(36), now()), 1);
        assert_eq!(days_left(now() + Duration::days(15), now()), 15);
        assert_eq!(days_left(now() + Duration::hours(23), now()), 0);
    }

    #[test]
    fn oversized_windows_saturate_instead_of_overflowing() {
        let windows = ExpiryWindows::new(200_000_000_000, i64::MAX, 200_000_000_000);

        assert!(windows.is_due_for_reminder(now() + Duration::days(365 * 50), now()));
        assert_eq!(
            windows.classify(now() + Duration::days(365 * 50), now()),
            ExpiryStatus::ExpiringSoon
        );
        assert_eq!(windows.dedup_cutoff(now()), DateTime::<Utc>::MIN_UTC);
    }
}
