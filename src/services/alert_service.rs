use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, PgPool};

use crate::error::Result;
use crate::models::job::Job;
use crate::models::saved_search::SavedSearch;
use crate::services::mail_service::AlertMailer;
use crate::services::saved_search_service::SavedSearchService;

/// How far back the first alert for a search looks for "new" jobs.
const FIRST_RUN_LOOKBACK_DAYS: i64 = 7;

/// Outcome of one dispatch decision for a single saved search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    NotEligible,
    NoNewMatches,
    SendFailed,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DispatchSummary {
    pub sent: usize,
    pub not_eligible: usize,
    pub no_new_matches: usize,
    pub failed: usize,
}

#[derive(Debug, FromRow)]
struct AlertCandidate {
    #[sqlx(flatten)]
    search: SavedSearch,
    user_email: String,
}

/// Evaluates every active, alert-enabled saved search and emails the owner
/// when new matching jobs appeared since the last alert. Both the hourly and
/// the daily trigger call [`AlertService::run_once`]; frequency gating alone
/// decides what fires on a given tick.
#[derive(Clone)]
pub struct AlertService {
    pool: PgPool,
    searches: SavedSearchService,
    frontend_url: String,
    batch_size: i64,
}

impl AlertService {
    pub fn new(pool: PgPool, frontend_url: String, batch_size: i64) -> Self {
        let searches = SavedSearchService::new(pool.clone());
        Self {
            pool,
            searches,
            frontend_url,
            batch_size,
        }
    }

    /// One full dispatch pass. A failing search is logged and skipped; it
    /// never aborts the rest of the batch.
    pub async fn run_once(&self, mailer: &dyn AlertMailer) -> Result<DispatchSummary> {
        let now = Utc::now();
        let candidates = self.load_candidates().await?;
        let total = candidates.len();

        let mut summary = DispatchSummary::default();
        for candidate in candidates {
            let search_id = candidate.search.id;
            match self
                .dispatch_one(&candidate.search, &candidate.user_email, now, mailer)
                .await
            {
                Ok(DispatchOutcome::Sent) => summary.sent += 1,
                Ok(DispatchOutcome::NotEligible) => summary.not_eligible += 1,
                Ok(DispatchOutcome::NoNewMatches) => summary.no_new_matches += 1,
                Ok(DispatchOutcome::SendFailed) => summary.failed += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(search_id = %search_id, error = ?e, "job alert dispatch failed");
                }
            }
        }

        tracing::info!(
            candidates = total,
            sent = summary.sent,
            no_new_matches = summary.no_new_matches,
            failed = summary.failed,
            "job alert run finished"
        );
        Ok(summary)
    }

    /// Active searches with alerts enabled, joined to the owner's address.
    /// Soft-deleted and alert-disabled searches never enter the batch.
    async fn load_candidates(&self) -> Result<Vec<AlertCandidate>> {
        let candidates = sqlx::query_as::<_, AlertCandidate>(
            r#"
            SELECT s.*, u.email AS user_email
            FROM saved_searches s
            JOIN users u ON u.id = s.user_id
            WHERE s.is_active AND s.email_alerts
            ORDER BY s.created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(candidates)
    }

    async fn dispatch_one(
        &self,
        search: &SavedSearch,
        user_email: &str,
        now: DateTime<Utc>,
        mailer: &dyn AlertMailer,
    ) -> Result<DispatchOutcome> {
        // The candidate query already filters these; kept as an invariant
        // guard so no other caller can dispatch a disabled search.
        if !search.is_active || !search.email_alerts {
            return Ok(DispatchOutcome::NotEligible);
        }
        if !search.alert_window_elapsed(now) {
            return Ok(DispatchOutcome::NotEligible);
        }

        let since = lookback_bound(search, now);
        let jobs = self
            .searches
            .find_new_matches(search, since, self.batch_size)
            .await?;

        // No new jobs: leave last_alert_sent untouched so a quiet period
        // does not swallow the catch-up alert once matches do appear.
        if jobs.is_empty() {
            return Ok(DispatchOutcome::NoNewMatches);
        }

        let subject = alert_subject(&search.name, jobs.len());
        let body = render_alert_html(search, &jobs, &self.frontend_url);

        if !mailer.send(user_email, &subject, &body).await {
            tracing::warn!(search_id = %search.id, "alert email handoff failed, state unchanged");
            return Ok(DispatchOutcome::SendFailed);
        }

        sqlx::query(
            r#"
            UPDATE saved_searches
            SET last_alert_sent = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(search.id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(DispatchOutcome::Sent)
    }
}

/// Jobs created after this instant count as "new" for the current dispatch.
pub fn lookback_bound(search: &SavedSearch, now: DateTime<Utc>) -> DateTime<Utc> {
    search
        .last_alert_sent
        .unwrap_or_else(|| now - Duration::days(FIRST_RUN_LOOKBACK_DAYS))
}

pub fn alert_subject(search_name: &str, job_count: usize) -> String {
    let plural = if job_count == 1 { "" } else { "s" };
    format!(
        "{} New Job{} Matching \"{}\"",
        job_count, plural, search_name
    )
}

/// Criteria serialized as the frontend's search query params, so the email's
/// "view all" link lands on the same result set.
fn search_query_string(search: &SavedSearch) -> String {
    let mut params = url::form_urlencoded::Serializer::new(String::new());
    if let Some(title) = search.title.as_deref() {
        params.append_pair("title", title);
    }
    if let Some(location) = search.location.as_deref() {
        params.append_pair("location", location);
    }
    if let Some(country) = search.country.as_deref() {
        params.append_pair("country", country);
    }
    if let Some(job_profile) = search.job_profile.as_deref() {
        params.append_pair("jobProfile", job_profile);
    }
    if let Some(work_type) = search.work_type.as_deref() {
        params.append_pair("workType", work_type);
    }
    if let Some(job_type) = search.job_type.as_deref() {
        params.append_pair("jobType", job_type);
    }
    if !search.skills.is_empty() {
        params.append_pair("skills", &search.skills.join(","));
    }
    params.finish()
}

pub fn render_alert_html(search: &SavedSearch, jobs: &[Job], frontend_url: &str) -> String {
    let mut items = String::new();
    for job in jobs {
        let location = job.location.as_deref().unwrap_or("");
        let salary_line = match job.salary.as_deref() {
            Some(salary) if !salary.is_empty() => {
                format!(r#"<p style="margin:5px 0;color:#666;">Salary: {}</p>"#, salary)
            }
            _ => String::new(),
        };
        items.push_str(&format!(
            r#"<li style="margin-bottom:20px;padding:15px;border:1px solid #ddd;border-radius:5px;">
  <h3 style="margin:0 0 10px 0;"><a href="{frontend_url}/{slug}" style="color:#0074b7;text-decoration:none;">{title}</a></h3>
  <p style="margin:5px 0;color:#666;">{company} - {location}</p>
  {salary_line}
</li>"#,
            slug = job.slug,
            title = job.title,
            company = job.company_name,
        ));
    }

    let plural = if jobs.len() == 1 { "" } else { "s" };
    let search_url = format!("{}/?{}", frontend_url, search_query_string(search));
    format!(
        r#"<div style="font-family:Arial,sans-serif;max-width:600px;margin:0 auto;">
  <h2 style="color:#0074b7;">New Jobs Matching Your Search: {search_name}</h2>
  <p>We found {count} new job{plural} that match your saved search criteria.</p>
  <ul style="list-style:none;padding:0;">{items}</ul>
  <p style="margin-top:30px;">
    <a href="{search_url}" style="background-color:#0074b7;color:white;padding:10px 20px;text-decoration:none;border-radius:5px;display:inline-block;">View All Matching Jobs</a>
  </p>
  <p style="color:#666;font-size:12px;margin-top:30px;">
    You're receiving this because you have email alerts enabled for this search.
    <a href="{frontend_url}/account">Manage your saved searches</a>
  </p>
</div>"#,
        search_name = search.name,
        count = jobs.len(),
    )
}
