pub mod alert_service;
pub mod job_service;
pub mod mail_service;
pub mod saved_search_service;
pub mod search_query;
