pub mod admin;
pub mod auth;
pub mod billing;
pub mod config;
pub mod db;
pub mod documents;
pub mod errors;
pub mod indexing;
pub mod jobs;
pub mod live;
pub mod llm_client;
pub mod models;
pub mod routes;
pub mod state;
pub mod status_bus;
pub mod storage;
pub mod store;
pub mod submission;
pub mod telemetry;
pub mod webhook;
pub mod worker;

#[cfg(test)]
pub mod test_support;
