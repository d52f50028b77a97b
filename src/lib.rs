//! Support ticket triage.
//!
//! Classifies free-text support tickets into a department and an urgency
//! with two TF-IDF + logistic regression models, persists the trained
//! artifacts, serves predictions over HTTP, and offers department-specific
//! troubleshooting guidance.

pub mod api;
pub mod assistant;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod ml;
pub mod models;

pub use error::{AppError, Result};
