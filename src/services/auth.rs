use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::app::config::Config;
use crate::models::user::{AuthResponse, LoginRequest, RegisterRequest, User};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Falha de rede: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Autenticação falhou ({status}): {body}")]
    Api { status: u16, body: String },
}

/// Cliente das rotas de conta do painel. É daqui que sai o bearer token
/// usado pelo gateway de pagamentos.
pub struct AuthClient {
    client: Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        }
    }

    /// POST /auth/login. Devolve o token de acesso.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let response = self
            .client
            .post(format!("{}/auth/login", self.base_url))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        let auth: AuthResponse = Self::ok_json(response).await?;
        Ok(auth.access_token)
    }

    /// POST /auth/register. Cria a conta e já devolve o token.
    pub async fn register(&self, request: &RegisterRequest) -> Result<String, AuthError> {
        let response = self
            .client
            .post(format!("{}/auth/register", self.base_url))
            .json(request)
            .send()
            .await?;

        let auth: AuthResponse = Self::ok_json(response).await?;
        Ok(auth.access_token)
    }

    /// GET /auth/me com o bearer token.
    pub async fn me(&self, token: &str) -> Result<User, AuthError> {
        let response = self
            .client
            .get(format!("{}/auth/me", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;

        Self::ok_json(response).await
    }

    async fn ok_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AuthError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}
