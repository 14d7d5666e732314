//! axum handlers, one module per caller audience.

pub mod activities;
pub mod auth;
pub mod external;
pub mod invitations;
pub mod people;
pub mod registrations;
