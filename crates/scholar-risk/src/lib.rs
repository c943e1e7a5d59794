//! Academic-risk prediction for students: feature encoding, a trained-classifier path with a
//! deterministic rule-based fallback, explanation synthesis, and the HTTP surface around it.

pub mod config;
pub mod error;
pub mod prediction;
pub mod telemetry;
