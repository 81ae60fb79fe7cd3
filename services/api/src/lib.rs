//! services/api/src/lib.rs
//!
//! The wizard service: HTTP adapters for the story backend and session storage,
//! plus the axum surface that drives the wizard steps.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
