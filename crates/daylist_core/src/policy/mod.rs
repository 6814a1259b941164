//! Business policies applied by stores.
//!
//! # Responsibility
//! - Keep time-based decisions pure so every backend applies them identically.

pub mod daily_reset;
