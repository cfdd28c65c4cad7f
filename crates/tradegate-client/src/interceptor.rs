//! Outbound request stages.
//!
//! An ordered list of request-mutating functions composed at client
//! construction time. Every dispatch runs the whole list, including the
//! refresh call (which then overrides the bearer with the refresh token).

use std::sync::Arc;

use reqwest::RequestBuilder;
use reqwest::header::{ACCEPT_LANGUAGE, AUTHORIZATION};

use crate::store::AccessStore;

/// A single outbound stage.
pub type OutboundStage = Box<dyn Fn(RequestBuilder) -> RequestBuilder + Send + Sync>;

/// Format a token for the `Authorization` header.
pub fn format_bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Stage attaching the stored access token as a bearer header.
///
/// Omits the header entirely when the store holds no token; the backend's
/// public endpoints (login) expect its absence.
pub fn bearer_stage(store: Arc<AccessStore>) -> OutboundStage {
    Box::new(move |request| match store.get().access_token.as_deref() {
        Some(token) if !token.is_empty() => {
            request.header(AUTHORIZATION, format_bearer(token))
        }
        _ => request,
    })
}

/// Stage attaching the locale context header.
pub fn locale_stage(locale: String) -> OutboundStage {
    Box::new(move |request| request.header(ACCEPT_LANGUAGE, locale.clone()))
}

/// Apply every stage in registration order.
pub fn apply(stages: &[OutboundStage], mut request: RequestBuilder) -> RequestBuilder {
    for stage in stages {
        request = stage(request);
    }
    request
}
