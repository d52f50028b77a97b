//! Department-specific troubleshooting assistant.
//!
//! Each department has one prompt template and one canned fallback answer.
//! When a language model backend is configured its output is returned;
//! otherwise, or when the backend fails, the fallback is returned.

pub mod gemini;
pub mod service;
pub mod templates;

pub use gemini::{GeminiClient, LanguageModel};
pub use service::{Assistance, Assistant};
pub use templates::DepartmentTemplate;
