use std::fmt;

use oauth2::{basic::BasicClient, AuthUrl, ClientId, ClientSecret, EndpointNotSet, EndpointSet, RedirectUrl, TokenUrl};
use serde::Deserialize;

use crate::{AppResult, Config};

type HappyClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ClientProvider {
    Github,
}

impl ClientProvider {
    pub fn scopes(&self) -> &'static [&'static str] {
        use ClientProvider::*;
        match self {
            Github => &["read:user"],
        }
    }
}

impl fmt::Display for ClientProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Clone)]
pub struct Clients {
    github_client: Option<HappyClient>,
}

impl Clients {
    pub fn none() -> Clients {
        Clients { github_client: None }
    }

    pub fn from_config(config: &Config) -> AppResult<Clients> {
        let github_client = 'a: {
            let (Some(client_id), Some(client_secret)) = (&config.github_client_id, &config.github_client_secret) else {
                break 'a None;
            };
            let client_id = ClientId::new(client_id.clone());
            let client_secret = ClientSecret::new(client_secret.clone());

            let auth_url = AuthUrl::new("https://github.com/login/oauth/authorize".to_string())?;
            let token_url = TokenUrl::new("https://github.com/login/oauth/access_token".to_string())?;
            let redirect_url = RedirectUrl::new(format!("{}/lockin/github", config.public_url))?;

            Some(
                BasicClient::new(client_id)
                .set_client_secret(client_secret)
                .set_auth_uri(auth_url)
                .set_token_uri(token_url)
                .set_redirect_uri(redirect_url)
            )
        };

        if github_client.is_none() {
            tracing::warn!("GitHub login disabled: GITHUB_CLIENT_ID/GITHUB_CLIENT_SECRET not set");
        }

        Ok(Clients { github_client })
    }

    pub fn get_client(&self, provider: ClientProvider) -> AppResult<HappyClient> {
        use ClientProvider::*;
        match provider {
            Github => self.github_client.clone(),
        }.ok_or(format!("OAuth provider {provider} keys not supplied").into())
    }
}
