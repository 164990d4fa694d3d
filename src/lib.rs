//! Client intake and application tracking for an immigration consulting
//! practice.
//!
//! Clients register and file one submission per service track (diploma
//! equivalence, permanent residence, travel-agency partnership); staff review
//! each submission and validate or reject it. The [`workflows::intake`]
//! module carries the per-service status state machine, the 24-hour rejection
//! cooldown, and the authorization rules around it.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
