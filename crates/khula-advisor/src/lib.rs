//! AI advisor capability for Khula
//!
//! Wraps the Gemini `generateContent` API behind a small client: text
//! prompts (optionally with an inline image) in, text out. Consumers treat
//! the advisor as best-effort; failures surface as `AdvisorError`.

pub mod client;
pub mod error;
pub mod prompts;

pub use client::AdvisorClient;
pub use error::AdvisorError;
pub use prompts::ModerationVerdict;
