use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use crate::dto::job_dto::{CreateJobPayload, JobListQuery};
use crate::error::{Error, Result};
use crate::models::job::Job;
use crate::utils::slug::slugify;

const JOB_COLUMNS: &str = "id, title, company_name, location, country, work_type, job_type, \
     job_profile, skills, experience_level, salary, apply_link, is_featured, views, status, \
     slug, created_by, created_at, updated_at";

#[derive(Clone)]
pub struct JobService {
    pool: PgPool,
}

pub struct JobList {
    pub items: Vec<Job>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl JobService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, payload: CreateJobPayload, created_by: Uuid) -> Result<Job> {
        let status = payload
            .status
            .clone()
            .unwrap_or_else(|| "active".to_string());
        if !matches!(status.as_str(), "active" | "expired" | "draft") {
            return Err(Error::BadRequest(format!("Invalid job status: {}", status)));
        }

        // Slugs carry a short random suffix so identical titles never collide.
        let suffix = &Uuid::new_v4().simple().to_string()[..8];
        let slug = format!("{}-{}", slugify(&payload.title), suffix);

        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            INSERT INTO jobs (
                title, company_name, location, country, work_type, job_type, job_profile,
                skills, experience_level, salary, apply_link, is_featured, status, slug, created_by
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(payload.title)
        .bind(payload.company_name)
        .bind(payload.location)
        .bind(payload.country)
        .bind(payload.work_type)
        .bind(payload.job_type)
        .bind(payload.job_profile)
        .bind(payload.skills)
        .bind(payload.experience_level)
        .bind(payload.salary)
        .bind(payload.apply_link)
        .bind(payload.is_featured)
        .bind(status)
        .bind(slug)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(job)
    }

    pub async fn list(&self, query: JobListQuery) -> Result<JobList> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.limit.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let mut items_builder =
            QueryBuilder::new(format!("SELECT {JOB_COLUMNS} FROM jobs WHERE status = 'active'"));
        let mut count_builder =
            QueryBuilder::new("SELECT COUNT(*) FROM jobs WHERE status = 'active'");

        for builder in [&mut items_builder, &mut count_builder] {
            let mut contains = |column: &str, value: &Option<String>| {
                if let Some(needle) = value.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                    builder.push(format!(" AND {} ILIKE ", column));
                    builder.push_bind(format!("%{}%", needle));
                }
            };
            contains("title", &query.title);
            contains("location", &query.location);
            contains("country", &query.country);
            contains("work_type", &query.work_type);
            contains("job_type", &query.job_type);

            if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
            {
                builder.push(" AND (title ILIKE ");
                builder.push_bind(format!("%{}%", search));
                builder.push(" OR company_name ILIKE ");
                builder.push_bind(format!("%{}%", search));
                builder.push(")");
            }
        }

        items_builder.push(" ORDER BY created_at DESC, is_featured DESC LIMIT ");
        items_builder.push_bind(per_page);
        items_builder.push(" OFFSET ");
        items_builder.push_bind(offset);

        let items = items_builder
            .build_query_as::<Job>()
            .fetch_all(&self.pool)
            .await?;
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i64;

        Ok(JobList {
            items,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    /// Fetch one active posting by slug, bumping its view counter.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Job> {
        sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs
            SET views = views + 1
            WHERE slug = $1 AND status = 'active'
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Job not found".to_string()))
    }
}
