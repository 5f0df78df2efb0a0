pub mod jobs;
pub mod models;
