//! Current-user endpoint.

use tradegate_models::UserInfo;

use crate::client::RequestClient;
use crate::error::Result;

/// Fetch the authenticated user's profile.
pub async fn me(client: &RequestClient) -> Result<UserInfo> {
    client.get("/v1/auth/me").await
}
