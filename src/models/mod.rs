pub mod job;
pub mod saved_search;
pub mod user;
