// Content Planner - calendar projection, optimistic mutations, and media
// functions for the agency content calendar

// Domain models and their wire rows
pub mod models;

// Remote store access, query cache, and object storage
pub mod infrastructure;

// Calendar projection and mutation reconciliation
pub mod services;

// Unified planner entry point
pub mod planner;

// Media edge functions
pub mod media_interface;

// Common utilities
pub mod app_state;
pub mod config;
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
pub use planner::Planner;
