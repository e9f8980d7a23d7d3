use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub company_name: String,
    pub location: Option<String>,
    pub country: Option<String>,
    pub work_type: Option<String>,
    pub job_type: Option<String>,
    pub job_profile: Option<String>,
    pub skills: Vec<String>,
    pub experience_level: Option<String>,
    /// Display string, e.g. "$90k-$120k" or "competitive". Not numerically
    /// comparable; see the salary handling note in the query builder.
    pub salary: Option<String>,
    pub apply_link: Option<String>,
    pub is_featured: bool,
    pub views: i64,
    pub status: String,
    pub slug: String,
    pub created_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
