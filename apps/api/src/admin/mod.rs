//! Read-only dashboard endpoints behind the admin bearer token.

pub mod handlers;
