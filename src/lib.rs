//! Freshet: a self-hosted feed aggregation engine.
//!
//! Subscriptions are fetched on a per-feed schedule, parsed from RSS 2.0,
//! Atom, or JSON Feed into one canonical model, run through an optional
//! per-feed transform pipeline (jq reshaping, page scraping, HTML cleanup),
//! deduplicated, and persisted to SQLite. Retention sweeps age items out
//! again.

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod fetcher;
pub mod parser;
pub mod pipeline;
pub mod refresh;
pub mod store;
