pub mod health;
pub mod jobs;
pub mod saved_search;
