//! Application services: forecast orchestration and payload transforms.

pub mod error;
pub mod forecast;
pub mod transform;
