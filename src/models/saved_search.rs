use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// How often an alert email may be sent for a saved search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "alert_frequency", rename_all = "lowercase")]
pub enum AlertFrequency {
    Instant,
    Daily,
    Weekly,
}

impl AlertFrequency {
    /// Minimum elapsed time since the last alert before this search may fire
    /// again. `Instant` has no window.
    pub fn window(self) -> Option<Duration> {
        match self {
            AlertFrequency::Instant => None,
            AlertFrequency::Daily => Some(Duration::hours(24)),
            AlertFrequency::Weekly => Some(Duration::days(7)),
        }
    }
}

impl Default for AlertFrequency {
    fn default() -> Self {
        AlertFrequency::Daily
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SavedSearch {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    // Search criteria, all optional and ANDed together.
    pub title: Option<String>,
    pub location: Option<String>,
    pub country: Option<String>,
    pub job_profile: Option<String>,
    pub work_type: Option<String>,
    pub job_type: Option<String>,
    pub skills: Vec<String>,
    pub salary_min: Option<Decimal>,
    pub salary_max: Option<Decimal>,
    pub experience_level: Option<String>,
    pub remote: Option<bool>,
    // Alert settings.
    pub email_alerts: bool,
    pub alert_frequency: AlertFrequency,
    pub last_alert_sent: Option<DateTime<Utc>>,
    // Metadata. `match_count` is a cached count, recomputed on create and
    // update; dispatch decisions never rely on it.
    pub is_active: bool,
    pub match_count: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SavedSearch {
    /// Whether enough time has passed since `last_alert_sent` for this
    /// search to fire at instant `now`, per its frequency setting.
    pub fn alert_window_elapsed(&self, now: DateTime<Utc>) -> bool {
        match self.alert_frequency.window() {
            None => true,
            Some(window) => match self.last_alert_sent {
                None => true,
                Some(last) => last < now - window,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search(frequency: AlertFrequency, last: Option<DateTime<Utc>>) -> SavedSearch {
        SavedSearch {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "test".into(),
            title: None,
            location: None,
            country: None,
            job_profile: None,
            work_type: None,
            job_type: None,
            skills: vec![],
            salary_min: None,
            salary_max: None,
            experience_level: None,
            remote: None,
            email_alerts: true,
            alert_frequency: frequency,
            last_alert_sent: last,
            is_active: true,
            match_count: 0,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn instant_is_always_eligible() {
        let now = Utc::now();
        assert!(search(AlertFrequency::Instant, None).alert_window_elapsed(now));
        assert!(search(AlertFrequency::Instant, Some(now)).alert_window_elapsed(now));
    }

    #[test]
    fn daily_respects_24h_window() {
        let now = Utc::now();
        let fresh = search(AlertFrequency::Daily, Some(now - Duration::hours(23)));
        assert!(!fresh.alert_window_elapsed(now));
        let stale = search(AlertFrequency::Daily, Some(now - Duration::hours(25)));
        assert!(stale.alert_window_elapsed(now));
    }

    #[test]
    fn weekly_respects_7d_window() {
        let now = Utc::now();
        let fresh = search(AlertFrequency::Weekly, Some(now - Duration::days(6)));
        assert!(!fresh.alert_window_elapsed(now));
        let stale = search(AlertFrequency::Weekly, Some(now - Duration::days(8)));
        assert!(stale.alert_window_elapsed(now));
    }

    #[test]
    fn never_sent_is_always_past_the_window() {
        let now = Utc::now();
        assert!(search(AlertFrequency::Daily, None).alert_window_elapsed(now));
        assert!(search(AlertFrequency::Weekly, None).alert_window_elapsed(now));
    }
}
