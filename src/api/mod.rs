// src/api/mod.rs

pub mod error;

pub use error::{ApiError, ApiResult};
