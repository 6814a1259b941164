//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Supply the current time so transport layers never touch the clock.

pub mod task_service;
