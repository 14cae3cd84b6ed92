// src/lib.rs

// Re-export or define the top-level modules you need
pub mod error;
pub mod models;
pub mod services;

// Shared boxed-error alias for the plumbing layers
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
