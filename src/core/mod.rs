//! Core sync engine: HTTP client, fingerprints, job plans and polling

pub mod client;
pub mod config;
pub mod errors;
pub mod hasher;
pub mod models;
pub mod plan;
pub mod poller;
pub mod service;
