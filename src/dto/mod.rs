pub mod job_dto;
pub mod saved_search_dto;
