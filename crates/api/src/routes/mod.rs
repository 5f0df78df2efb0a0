//! Route tables.
//!
//! ```text
//! /health                      service health and job counts
//!
//! /upload                      submit an image (POST)
//! /status/{id}                 job status
//! /download/{id}               artifact of a completed job
//!
//! /api/models                  list catalogued models
//! /api/models/{id}             get, delete
//!
//! /                            static/index.html
//! /static/*                    static files
//! ```

pub mod health;
pub mod jobs;
pub mod models;
