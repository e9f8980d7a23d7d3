use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::job::Job;
use crate::models::saved_search::{AlertFrequency, SavedSearch};

/// Skills arrive either as a JSON array or as a comma-separated string;
/// both are accepted on create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SkillsInput {
    List(Vec<String>),
    Csv(String),
}

impl SkillsInput {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            SkillsInput::List(items) => items
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            SkillsInput::Csv(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

/// A name that trims to nothing would be stored as an empty string, so the
/// check runs on the trimmed value rather than the raw length.
fn name_has_content(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("name_blank"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSavedSearchPayload {
    #[validate(custom(function = "name_has_content", message = "Search name is required"))]
    pub name: String,
    pub title: Option<String>,
    pub location: Option<String>,
    pub country: Option<String>,
    pub job_profile: Option<String>,
    pub work_type: Option<String>,
    pub job_type: Option<String>,
    pub skills: Option<SkillsInput>,
    pub salary_min: Option<Decimal>,
    pub salary_max: Option<Decimal>,
    pub experience_level: Option<String>,
    pub remote: Option<bool>,
    pub email_alerts: Option<bool>,
    pub alert_frequency: Option<AlertFrequency>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateSavedSearchPayload {
    #[validate(custom(function = "name_has_content", message = "Search name cannot be empty"))]
    pub name: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub country: Option<String>,
    pub job_profile: Option<String>,
    pub work_type: Option<String>,
    pub job_type: Option<String>,
    pub skills: Option<SkillsInput>,
    pub salary_min: Option<Decimal>,
    pub salary_max: Option<Decimal>,
    pub experience_level: Option<String>,
    pub remote: Option<bool>,
    pub email_alerts: Option<bool>,
    pub alert_frequency: Option<AlertFrequency>,
}

#[derive(Debug, Serialize)]
pub struct SavedSearchResponse {
    pub saved_search: SavedSearch,
    pub match_count: i64,
}

impl From<SavedSearch> for SavedSearchResponse {
    fn from(saved_search: SavedSearch) -> Self {
        let match_count = saved_search.match_count;
        Self {
            saved_search,
            match_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SavedSearchListResponse {
    pub saved_searches: Vec<SavedSearch>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingJobsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MatchingJobsResponse {
    pub jobs: Vec<Job>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}
