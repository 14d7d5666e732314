//! Core types and trait definitions for the Campus workflow backend.
//!
//! This crate is deliberately free of HTTP and database dependencies. It holds
//! the domain model, the business error taxonomy, the pure role-cascade
//! planner and the [`store::CampusStore`] abstraction every backend implements.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
#![allow(async_fn_in_trait)]

pub mod activity;
pub mod de;
pub mod error;
pub mod invitation;
pub mod outcome;
pub mod person;
pub mod registration;
pub mod roles;
pub mod session;
pub mod store;

pub use error::{Classify, Error, Result};
