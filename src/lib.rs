//! People counter worker
//!
//! Consumes people-counting jobs from a Redis list, runs a YOLO person
//! detector on the referenced camera snapshot, and publishes the count to a
//! result list for the web application to pick up.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
