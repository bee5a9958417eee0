// src/api/mod.rs
pub mod jobs;
pub mod results;
pub mod stats;

// Re-export all route functions
pub use jobs::*;
pub use results::*;
pub use stats::*;
