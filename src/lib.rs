pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    job_service::JobService, saved_search_service::SavedSearchService,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub job_service: JobService,
    pub saved_search_service: SavedSearchService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let job_service = JobService::new(pool.clone());
        let saved_search_service = SavedSearchService::new(pool.clone());

        Self {
            pool,
            job_service,
            saved_search_service,
        }
    }
}
