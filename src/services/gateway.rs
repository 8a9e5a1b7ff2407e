use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::app::config::Config;
use crate::models::charge::{ChargePayload, PixPayload};
use crate::models::pix::PixQuote;
use crate::models::status::OrderStatus;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Falha de rede: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Gateway respondeu {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Pedido criado, mas sem ID")]
    MissingOrderId,
    #[error("Resposta inesperada do gateway: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

/// Cliente do backend de pagamentos. Todas as rotas levam o bearer token;
/// dados de cartão nunca passam por aqui, só o token de uso único.
pub struct PaymentGatewayClient {
    client: Client,
    base_url: String,
    token: String,
}

impl PaymentGatewayClient {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
        }
    }

    /// POST /payments/charge. Devolve o id do pedido criado.
    pub async fn charge(&self, payload: &ChargePayload) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(format!("{}/payments/charge", self.base_url))
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await?;

        let body = Self::read_json(response).await?;
        extract_order_id(&body).ok_or(GatewayError::MissingOrderId)
    }

    /// POST /payments/pix. Aceita resposta com ou sem envelope `data`.
    pub async fn create_pix(&self, payload: &PixPayload) -> Result<PixQuote, GatewayError> {
        let response = self
            .client
            .post(format!("{}/payments/pix", self.base_url))
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await?;

        let body = Self::read_json(response).await?;
        let body = unwrap_data(body);
        debug!("pix quote received");
        Ok(serde_json::from_value(body)?)
    }

    /// GET /payments/status/{order_id}.
    pub async fn status(&self, order_id: &str) -> Result<OrderStatus, GatewayError> {
        let response = self
            .client
            .get(format!("{}/payments/status/{}", self.base_url, order_id))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let body = Self::read_json(response).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// URL do stream de eventos de um pedido.
    pub fn stream_url(&self, order_id: &str) -> String {
        format!("{}/payments/stream/{}", self.base_url, order_id)
    }

    /// GET já autorizado para abrir o stream.
    pub fn stream_request(&self, order_id: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.stream_url(order_id))
            .bearer_auth(&self.token)
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

/// Id do pedido na resposta da cobrança: `id`, `data.id` ou `order_id`,
/// o primeiro não vazio.
pub(crate) fn extract_order_id(body: &Value) -> Option<String> {
    body.get("id")
        .and_then(id_value)
        .or_else(|| body.get("data").and_then(|d| d.get("id")).and_then(id_value))
        .or_else(|| body.get("order_id").and_then(id_value))
}

fn id_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Algumas rotas embrulham o corpo em `data`; outras não.
pub(crate) fn unwrap_data(body: Value) -> Value {
    if let Value::Object(map) = &body {
        if let Some(inner) = map.get("data") {
            if !inner.is_null() {
                return inner.clone();
            }
        }
    }
    body
}
