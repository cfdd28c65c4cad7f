//! Authenticated request pipeline for the Tradegate backend.
//!
//! The pipeline guarantees, under any number of concurrent in-flight
//! requests:
//!
//! - every call carries the stored bearer credential and locale headers;
//! - `{code, data, message}` envelopes are validated and unwrapped;
//! - a burst of 401s produces exactly one credential refresh, with every
//!   affected request replayed exactly once against the new token;
//! - when refresh is unavailable or fails, re-authentication is escalated
//!   exactly once (soft expiry prompt or hard logout, per configuration);
//! - each failed top-level call reaches the notification sink exactly once,
//!   cancelled calls never.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod notify;
pub mod refresh;
pub mod session;
pub mod store;

pub use client::{ClientBuilder, RequestClient, RequestOptions};
pub use config::ClientConfig;
pub use error::{ApiError, Result};
pub use notify::{Notifier, RecordingNotifier, TracingNotifier};
pub use refresh::{RefreshFailure, RefreshGate};
pub use session::{ExpiryMode, NoopHooks, ReauthTrigger, SessionHooks};
pub use store::AccessStore;
