//! Domain layer for the event console.
//!
//! This crate contains:
//! - Wire/domain models (Guest, ImportRowResult, CheckInReply, AdminUser)
//! - Pure business rules (header classification, message catalogue,
//!   capability gate, plus-one capacity)

pub mod models;
pub mod services;
