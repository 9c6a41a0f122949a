//! Gemini `generateContent` client.
//!
//! Wraps the external model API behind the [`TextGenerator`] trait with a
//! fixed, non-configurable sampling and safety policy; temperature is the
//! only per-call knob. No retries: every failure is terminal for the
//! attempt and the caller decides whether to try again.

mod client;
mod config;
mod error;
mod protocol;

pub use client::{GeminiClient, TextGenerator};
pub use config::GeminiConfig;
pub use error::{GenerationError, Result};
