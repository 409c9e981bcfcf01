//! Common utilities shared by the meal-log gate and its test harness.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (size limits, header/claim peeking, iat validation)
pub mod jwt;
