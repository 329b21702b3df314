// src/ai/mod.rs
pub mod connector;
pub mod error;
pub mod gemini;
