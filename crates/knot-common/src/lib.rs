pub mod error;
pub mod gemini;
pub mod ids;
