//! Shared wire types for the Tradegate client.
//!
//! Everything the backend puts on the wire lives here: the uniform
//! response envelope, the bearer credential pair, and the auth/user
//! payloads consumed by the request pipeline.

pub mod auth;
pub mod credential;
pub mod envelope;

pub use auth::{AccessCodes, LoginParams, LoginResult, RefreshResult, UserInfo};
pub use credential::{Credential, SessionState};
pub use envelope::Envelope;
