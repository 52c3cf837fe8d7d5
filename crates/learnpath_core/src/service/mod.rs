//! Learning path use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into path-level operations.
//! - Keep callers decoupled from storage details.

pub mod clone_service;
pub mod path_service;
