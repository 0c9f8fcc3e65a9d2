//! Project-level workflows built on the core engine

pub mod locales;
pub mod orchestrator;
