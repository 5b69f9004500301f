//! Solar Sentinel forecast server.
//!
//! A caching proxy between the dashboard and the Open-Meteo forecast API.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;
