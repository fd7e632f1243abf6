use axum::{debug_handler, extract::{Path, Query, State}, http::header::USER_AGENT, response::{IntoResponse, Redirect}};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeVerifier, TokenResponse};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{kv::SharedKv, session::{Identity, CSRF_STATE, PKCE_VERIFIER, RETURN_URL, USER}, AppError, AppResult};

use super::{clients::ClientProvider, save_user, Clients};

#[derive(Deserialize)]
pub struct LockinQuery {
    pub state: Option<String>,
    pub code: Option<String>,
}

#[derive(Deserialize)]
struct GithubUser {
    id: u64,
    login: String,
    name: Option<String>,
    avatar_url: Option<String>,
}

impl From<GithubUser> for Identity {
    fn from(user: GithubUser) -> Identity {
        Identity {
            id: format!("github-{}", user.id),
            name: Some(user.name.filter(|name| !name.trim().is_empty()).unwrap_or(user.login)),
            avatar: user.avatar_url,
        }
    }
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn lockin(
    Path(provider): Path<ClientProvider>,
    Query(LockinQuery { state, code }): Query<LockinQuery>,
    State(clients): State<Clients>,
    State(kv): State<SharedKv>,
    session: Session,
) -> AppResult<impl IntoResponse> {
    let state = CsrfToken::new(state.ok_or(AppError::bad_request("OAuth: without state"))?);
    let code = AuthorizationCode::new(code.ok_or(AppError::bad_request("OAuth: without code"))?);

    let Some(stored_state) = session.remove::<String>(CSRF_STATE).await? else {
        return Err(AppError::bad_request("no csrf_state"));
    };

    if state.secret().as_str() != stored_state.as_str() {
        return Err(AppError::bad_request("csrf tokens don't match"));
    }

    let Some(pkce_verifier) = session.remove::<String>(PKCE_VERIFIER).await? else {
        return Err(AppError::bad_request("no pkce_verifier"));
    };

    let client = clients.get_client(provider)?;
    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let token_result = client
        .exchange_code(code)
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
        .request_async(&http_client)
        .await?;

    let access_token = token_result.access_token().secret();
    let user: GithubUser = http_client.get("https://api.github.com/user")
        .bearer_auth(access_token)
        .header(USER_AGENT, env!("CARGO_PKG_NAME"))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let identity = Identity::from(user);
    session.insert(USER, &identity).await?;
    save_user(&kv, &identity).await;

    tracing::info!(user = %identity.id, %provider, "logged in");

    let return_url: String = session.remove(RETURN_URL).await?.unwrap_or("/".to_string());
    Ok(Redirect::to(return_url.as_str()))
}
