//! Authentication endpoints and the login/logout flows.

use tracing::info;
use tradegate_models::{AccessCodes, Credential, LoginParams, LoginResult, UserInfo};

use crate::client::RequestClient;
use crate::error::Result;

use super::user;

/// Everything a freshly established session carries.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: UserInfo,
    pub access_codes: AccessCodes,
}

/// Log in, store the credential pair and load the user's profile.
///
/// Access codes are the union of role names and fine-grained permissions;
/// both lists come back on the user profile.
pub async fn login(client: &RequestClient, params: &LoginParams) -> Result<LoginOutcome> {
    let result: LoginResult = client.post("/v1/auth/login", params).await?;

    client.store().set(Credential::new(
        result.access_token.clone(),
        result.refresh_token.clone(),
    ));
    client.store().mark_checked();
    client.reset_session();

    let user = user::me(client).await?;
    let access_codes = user.access_codes();

    info!(username = %user.username, "login complete");

    Ok(LoginOutcome { user, access_codes })
}

/// Fetch the current user's access codes.
pub async fn access_codes(client: &RequestClient) -> Result<Vec<String>> {
    client.get("/v1/auth/codes").await
}

/// Force a refresh of the access token, deduplicated with any automatic
/// refresh cycle already in flight.
pub async fn refresh(client: &RequestClient) -> Result<String> {
    client.refresh_access_token().await
}

/// Log out.
///
/// The backend session is a stateless JWT, so there is nothing to revoke
/// server-side; the credential pair is dropped and navigation is handed to
/// the session hooks.
pub async fn logout(client: &RequestClient, redirect: bool) {
    client.session().logout(redirect).await;
    client.reset_session();
}
