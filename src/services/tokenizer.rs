use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::app::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum TokenizerError {
    #[error("Chave pública do tokenizador não configurada")]
    MissingPublicKey,
    #[error("Falha de rede na tokenização: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Tokenização falhou ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("Token inválido")]
    InvalidToken,
}

/// Dados crus do cartão. Só existem no caminho até o tokenizador.
#[derive(Debug, Clone)]
pub struct CardData {
    pub number: String,
    pub holder_name: String,
    pub exp_month: String,
    pub exp_year: String,
    pub cvv: String,
}

/// Cliente do tokenizador de cartões. A autenticação é a chave pública na
/// query string; a rota não recebe Authorization nem o token do painel.
pub struct CardTokenizerClient {
    client: Client,
    tokenize_url: String,
    public_key: String,
}

impl CardTokenizerClient {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            tokenize_url: config.tokenize_url.clone(),
            public_key: config.pagarme_public_key.clone(),
        }
    }

    /// Troca os dados do cartão por um token de uso único.
    pub async fn tokenize(&self, card: &CardData) -> Result<String, TokenizerError> {
        if self.public_key.trim().is_empty() {
            return Err(TokenizerError::MissingPublicKey);
        }

        let payload = json!({
            "type": "card",
            "card": {
                "number": card.number,
                "holder_name": card.holder_name,
                "exp_month": card.exp_month,
                "exp_year": card.exp_year,
                "cvv": card.cvv,
            }
        });

        let response = self
            .client
            .post(&self.tokenize_url)
            .query(&[("appId", self.public_key.as_str())])
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TokenizerError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        match body.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => {
                debug!("card tokenized");
                Ok(id.to_string())
            }
            _ => Err(TokenizerError::InvalidToken),
        }
    }
}
