use std::env;

use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_token: String,
    pub tokenize_url: String,
    pub pagarme_public_key: String,
    pub http_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub sse_reconnect_delay_ms: u64,
    pub redirect_delay_ms: u64,
    pub success_redirect: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_url: env::var("API_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            api_token: env::var("API_TOKEN")
                .unwrap_or_else(|_| String::new()),
            tokenize_url: env::var("TOKENIZE_URL")
                .unwrap_or_else(|_| "https://api.pagar.me/core/v5/tokens".to_string()),
            pagarme_public_key: env::var("PAGARME_PUBLIC_KEY")
                .unwrap_or_else(|_| String::new()),
            http_timeout_ms: env::var("HTTP_TIMEOUT_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            poll_interval_ms: env::var("POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            sse_reconnect_delay_ms: env::var("SSE_RECONNECT_DELAY_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap_or(1000),
            redirect_delay_ms: env::var("REDIRECT_DELAY_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            success_redirect: env::var("SUCCESS_REDIRECT")
                .unwrap_or_else(|_| "/dashboard".to_string()),
        }
    }

    /// Confere que as bases de API e de tokenização são URLs válidas.
    pub fn validate(&self) -> Result<(), url::ParseError> {
        Url::parse(&self.api_url)?;
        Url::parse(&self.tokenize_url)?;
        Ok(())
    }
}
