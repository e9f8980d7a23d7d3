use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use crate::dto::saved_search_dto::{CreateSavedSearchPayload, UpdateSavedSearchPayload};
use crate::error::{Error, Result};
use crate::models::job::Job;
use crate::models::saved_search::{AlertFrequency, SavedSearch};
use crate::services::search_query::{build_conditions, push_where};

const SAVED_SEARCH_COLUMNS: &str = "id, user_id, name, title, location, country, job_profile, \
     work_type, job_type, skills, salary_min, salary_max, experience_level, remote, \
     email_alerts, alert_frequency, last_alert_sent, is_active, match_count, created_at, updated_at";

const JOB_COLUMNS: &str = "id, title, company_name, location, country, work_type, job_type, \
     job_profile, skills, experience_level, salary, apply_link, is_featured, views, status, \
     slug, created_by, created_at, updated_at";

#[derive(Clone)]
pub struct SavedSearchService {
    pool: PgPool,
}

impl SavedSearchService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        payload: CreateSavedSearchPayload,
    ) -> Result<SavedSearch> {
        let skills = payload.skills.map(|s| s.into_vec()).unwrap_or_default();
        let email_alerts = payload.email_alerts.unwrap_or(true);
        let alert_frequency = payload.alert_frequency.unwrap_or_default();

        let search = sqlx::query_as::<_, SavedSearch>(&format!(
            r#"
            INSERT INTO saved_searches (
                user_id, name, title, location, country, job_profile, work_type, job_type,
                skills, salary_min, salary_max, experience_level, remote,
                email_alerts, alert_frequency
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)
            RETURNING {SAVED_SEARCH_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(payload.name.trim())
        .bind(payload.title)
        .bind(payload.location)
        .bind(payload.country)
        .bind(payload.job_profile)
        .bind(payload.work_type)
        .bind(payload.job_type)
        .bind(skills)
        .bind(payload.salary_min)
        .bind(payload.salary_max)
        .bind(payload.experience_level)
        .bind(payload.remote)
        .bind(email_alerts)
        .bind(alert_frequency)
        .fetch_one(&self.pool)
        .await?;

        self.refresh_match_count(search).await
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<SavedSearch>> {
        let searches = sqlx::query_as::<_, SavedSearch>(&format!(
            r#"
            SELECT {SAVED_SEARCH_COLUMNS}
            FROM saved_searches
            WHERE user_id = $1 AND is_active
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(searches)
    }

    /// Fetches a search owned by `user_id`. Inactive searches are treated
    /// exactly like missing ones.
    pub async fn get_owned(&self, user_id: Uuid, id: Uuid) -> Result<SavedSearch> {
        sqlx::query_as::<_, SavedSearch>(&format!(
            r#"
            SELECT {SAVED_SEARCH_COLUMNS}
            FROM saved_searches
            WHERE id = $1 AND user_id = $2 AND is_active
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Saved search not found".to_string()))
    }

    /// Partial update: omitted fields keep their stored value. A criterion
    /// cannot be cleared back to NULL through this path; clients send a
    /// replacement value or recreate the search.
    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        payload: UpdateSavedSearchPayload,
    ) -> Result<SavedSearch> {
        self.get_owned(user_id, id).await?;

        let skills: Option<Vec<String>> = payload.skills.map(|s| s.into_vec());
        let alert_frequency: Option<AlertFrequency> = payload.alert_frequency;

        let search = sqlx::query_as::<_, SavedSearch>(&format!(
            r#"
            UPDATE saved_searches
            SET
                name = COALESCE($3, name),
                title = COALESCE($4, title),
                location = COALESCE($5, location),
                country = COALESCE($6, country),
                job_profile = COALESCE($7, job_profile),
                work_type = COALESCE($8, work_type),
                job_type = COALESCE($9, job_type),
                skills = COALESCE($10, skills),
                salary_min = COALESCE($11, salary_min),
                salary_max = COALESCE($12, salary_max),
                experience_level = COALESCE($13, experience_level),
                remote = COALESCE($14, remote),
                email_alerts = COALESCE($15, email_alerts),
                alert_frequency = COALESCE($16, alert_frequency),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND is_active
            RETURNING {SAVED_SEARCH_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(payload.name.map(|n| n.trim().to_string()))
        .bind(payload.title)
        .bind(payload.location)
        .bind(payload.country)
        .bind(payload.job_profile)
        .bind(payload.work_type)
        .bind(payload.job_type)
        .bind(skills)
        .bind(payload.salary_min)
        .bind(payload.salary_max)
        .bind(payload.experience_level)
        .bind(payload.remote)
        .bind(payload.email_alerts)
        .bind(alert_frequency)
        .fetch_one(&self.pool)
        .await?;

        self.refresh_match_count(search).await
    }

    /// Soft delete only; the row stays for audit but disappears from every
    /// listing, match and dispatch path.
    pub async fn soft_delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let res = sqlx::query(
            r#"
            UPDATE saved_searches
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND is_active
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if res.rows_affected() == 0 {
            return Err(Error::NotFound("Saved search not found".to_string()));
        }
        Ok(())
    }

    /// Cardinality of the full (unbounded) match set. Read-only.
    pub async fn count_matches(&self, search: &SavedSearch) -> Result<i64> {
        let conditions = build_conditions(search, None);
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM jobs");
        push_where(&mut builder, &conditions);
        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Paginated match set for the "view matching jobs" action. Newest first,
    /// featured postings win ties.
    pub async fn find_matches(
        &self,
        search: &SavedSearch,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Job>, i64)> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let offset = (page - 1) * limit;

        let conditions = build_conditions(search, None);

        let mut builder = QueryBuilder::new(format!("SELECT {JOB_COLUMNS} FROM jobs"));
        push_where(&mut builder, &conditions);
        builder.push(" ORDER BY created_at DESC, is_featured DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);
        let jobs = builder
            .build_query_as::<Job>()
            .fetch_all(&self.pool)
            .await?;

        let total = self.count_matches(search).await?;

        Ok((jobs, total))
    }

    /// Matches created after `since`, newest first, capped at `limit` to
    /// bound the alert payload. Used only by the dispatcher.
    pub async fn find_new_matches(
        &self,
        search: &SavedSearch,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Job>> {
        let conditions = build_conditions(search, Some(since));

        let mut builder = QueryBuilder::new(format!("SELECT {JOB_COLUMNS} FROM jobs"));
        push_where(&mut builder, &conditions);
        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(limit.max(1));
        let jobs = builder
            .build_query_as::<Job>()
            .fetch_all(&self.pool)
            .await?;

        Ok(jobs)
    }

    async fn refresh_match_count(&self, search: SavedSearch) -> Result<SavedSearch> {
        let count = self.count_matches(&search).await?;
        let search = sqlx::query_as::<_, SavedSearch>(&format!(
            r#"
            UPDATE saved_searches
            SET match_count = $2
            WHERE id = $1
            RETURNING {SAVED_SEARCH_COLUMNS}
            "#
        ))
        .bind(search.id)
        .bind(count)
        .fetch_one(&self.pool)
        .await?;
        Ok(search)
    }
}
