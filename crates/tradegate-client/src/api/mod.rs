//! Thin typed endpoint wrappers.
//!
//! Each wrapper is a plain function over the shared
//! [`RequestClient`](crate::client::RequestClient)
//! with no awareness of auth mechanics; the pipeline handles credentials,
//! refresh and error normalization underneath.

pub mod auth;
pub mod user;
