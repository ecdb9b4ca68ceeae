//! BagiBagi donation webhook relay.
//!
//! Receives donation notifications from BagiBagi, optionally verifies a shared
//! secret, normalizes the loosely structured body into a [`DonationNotice`]
//! and publishes it to a Roblox universe through Open Cloud MessagingService.
//! Each request is independent: one publish attempt, no retries, no storage.
//!
//! # Modules
//!
//! - [`routes`] — HTTP handlers (webhook pipeline, readiness, metrics)
//! - [`config`] — [`RelayConfig`] loaded from the environment, [`TokenPolicy`]
//! - [`token`] — caller token lookup and verification
//! - [`donation`] — ordered-fallback field extraction
//! - [`messaging`] — the single bounded MessagingService call
//! - [`error`] — [`WebhookError`] and its HTTP mapping
//! - [`metrics`] — Prometheus metrics for the pipeline
//!
//! [`DonationNotice`]: donation::DonationNotice

pub mod config;
pub mod cors;
pub mod donation;
pub mod error;
pub mod messaging;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod token;

pub use config::{RelayConfig, TokenPolicy};
pub use error::WebhookError;
pub use state::AppState;
