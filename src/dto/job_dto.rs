use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::job::Job;
use crate::services::job_service::JobList;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateJobPayload {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub company_name: String,
    pub location: Option<String>,
    pub country: Option<String>,
    pub work_type: Option<String>,
    pub job_type: Option<String>,
    pub job_profile: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub experience_level: Option<String>,
    pub salary: Option<String>,
    pub apply_link: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub country: Option<String>,
    pub work_type: Option<String>,
    pub job_type: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job: Job,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self { job }
    }
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<Job>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl From<JobList> for JobListResponse {
    fn from(list: JobList) -> Self {
        Self {
            jobs: list.items,
            total: list.total,
            page: list.page,
            limit: list.per_page,
            total_pages: list.total_pages,
        }
    }
}
