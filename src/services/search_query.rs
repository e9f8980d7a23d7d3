use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use crate::models::saved_search::SavedSearch;

/// One predicate on the jobs table. Conditions are built from a saved search
/// without touching the database, then rendered into a WHERE clause with
/// bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum JobCondition {
    /// Only active postings are ever matched.
    StatusActive,
    /// Case-insensitive substring match on a text column.
    TextContains {
        column: &'static str,
        needle: String,
    },
    /// Exact work-type match, used when the remote flag is set.
    WorkTypeExact(String),
    /// Job skills overlap the search skills (ANY-of, not subset).
    SkillsOverlap(Vec<String>),
    /// The posting has a non-empty salary string. Salary is free text in the
    /// data model, so min/max bounds cannot be range-filtered; this presence
    /// check is the whole of the salary criterion.
    SalaryPresent,
    /// Posting created strictly after the given instant.
    CreatedAfter(DateTime<Utc>),
}

/// Maps a saved search (and optional "new since" bound) to the list of
/// conditions a matching job must satisfy. Pure, no I/O.
pub fn build_conditions(search: &SavedSearch, since: Option<DateTime<Utc>>) -> Vec<JobCondition> {
    let mut conditions = vec![JobCondition::StatusActive];

    let mut text = |column: &'static str, value: &Option<String>| {
        if let Some(needle) = value.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            conditions.push(JobCondition::TextContains {
                column,
                needle: needle.to_string(),
            });
        }
    };

    text("title", &search.title);
    text("location", &search.location);
    text("country", &search.country);
    text("job_profile", &search.job_profile);
    text("job_type", &search.job_type);
    text("experience_level", &search.experience_level);

    // The remote flag forces an exact work-type match and wins over any
    // explicit work_type criterion. Later-assignment-wins, kept as-is.
    if search.remote == Some(true) {
        conditions.push(JobCondition::WorkTypeExact("Remote".to_string()));
    } else if let Some(work_type) = search
        .work_type
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        conditions.push(JobCondition::TextContains {
            column: "work_type",
            needle: work_type.to_string(),
        });
    }

    if !search.skills.is_empty() {
        conditions.push(JobCondition::SkillsOverlap(search.skills.clone()));
    }

    if search.salary_min.is_some() || search.salary_max.is_some() {
        conditions.push(JobCondition::SalaryPresent);
    }

    if let Some(since) = since {
        conditions.push(JobCondition::CreatedAfter(since));
    }

    conditions
}

/// Appends ` WHERE ...` for the given conditions, binding parameters as it
/// goes. `builder` must already hold the SELECT part of the statement.
pub fn push_where(builder: &mut QueryBuilder<'_, Postgres>, conditions: &[JobCondition]) {
    builder.push(" WHERE ");
    for (idx, condition) in conditions.iter().enumerate() {
        if idx > 0 {
            builder.push(" AND ");
        }
        match condition {
            JobCondition::StatusActive => {
                builder.push("status = 'active'");
            }
            JobCondition::TextContains { column, needle } => {
                builder.push(*column);
                builder.push(" ILIKE ");
                builder.push_bind(format!("%{}%", escape_like(needle)));
            }
            JobCondition::WorkTypeExact(value) => {
                builder.push("work_type = ");
                builder.push_bind(value.clone());
            }
            JobCondition::SkillsOverlap(skills) => {
                builder.push("skills && ");
                builder.push_bind(skills.clone());
            }
            JobCondition::SalaryPresent => {
                builder.push("(salary IS NOT NULL AND salary <> '')");
            }
            JobCondition::CreatedAfter(since) => {
                builder.push("created_at > ");
                builder.push_bind(*since);
            }
        }
    }
}

/// Escapes LIKE metacharacters so user input matches as a literal substring.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
