//! Shared utilities and common types for the event console.
//!
//! This crate provides common functionality used across all other crates:
//! - Session token claim decoding
//! - Pagination parameters for list endpoints
//! - Text normalisation for header matching
//! - Common validation logic

pub mod jwt;
pub mod pagination;
pub mod text;
pub mod validation;
