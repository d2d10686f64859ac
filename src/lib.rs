//! Brokerage Portfolio Sync Library
//!
//! Fetches the legacy export of an insurance brokerage (clients, policies,
//! claims and production records), maps its loosely-typed rows into the
//! dashboard's schema and falls back to a demo dataset whenever the source
//! cannot be reached or trusted.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `dashboard`: Aggregate figures for the dashboard screen.
//! - `errors`: Error handling types.
//! - `fallback`: Demo dataset generator.
//! - `handlers`: HTTP request handlers and shared state.
//! - `mapping`: Raw row to schema field mapping.
//! - `models`: Internal schema.
//! - `rules`: Table-driven legacy code translation.
//! - `sync_client`: Sync adapter for the export backend.
//! - `sync_models`: Raw payload and sync report models.

pub mod config;
pub mod dashboard;
pub mod errors;
pub mod fallback;
pub mod handlers;
pub mod mapping;
pub mod models;
pub mod rules;
pub mod sync_client;
pub mod sync_models;
