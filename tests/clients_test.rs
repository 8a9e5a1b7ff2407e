use std::sync::Arc;

use serde_json::{json, Map};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use cobranca::app::config::Config;
use cobranca::models::charge::{
    BillingAddress, ChargeCustomer, ChargePayload, PixCustomer, PixPayload,
};
use cobranca::models::user::RegisterRequest;
use cobranca::services::auth::{AuthClient, AuthError};
use cobranca::services::gateway::{GatewayError, PaymentGatewayClient};
use cobranca::services::tokenizer::{CardData, CardTokenizerClient, TokenizerError};

fn config_for(server: &MockServer) -> Arc<Config> {
    Arc::new(Config {
        api_url: server.uri(),
        api_token: "tok_secreto".to_string(),
        tokenize_url: format!("{}/core/v5/tokens", server.uri()),
        pagarme_public_key: "pk_test_123".to_string(),
        http_timeout_ms: 2000,
        poll_interval_ms: 100,
        sse_reconnect_delay_ms: 50,
        redirect_delay_ms: 50,
        success_redirect: "/dashboard".to_string(),
    })
}

fn charge_payload() -> ChargePayload {
    let address = BillingAddress {
        street: "Rua das Flores".to_string(),
        number: "100".to_string(),
        complement: None,
        neighborhood: Some("Centro".to_string()),
        zip_code: "88010000".to_string(),
        city: "Florianópolis".to_string(),
        state: "SC".to_string(),
        country: "BR".to_string(),
    };
    ChargePayload {
        amount: 10654,
        card_token: "token_abc".to_string(),
        installments: 3,
        customer: ChargeCustomer {
            name: "Maria Souza".to_string(),
            email: "maria@example.com".to_string(),
            document: "52982030025".to_string(),
            phone: "48999990000".to_string(),
            address: address.clone(),
        },
        billing_address: address,
        description: "Profissional".to_string(),
        metadata: Map::new(),
    }
}

#[tokio::test]
async fn charge_sends_bearer_and_returns_order_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments/charge"))
        .and(header("authorization", "Bearer tok_secreto"))
        .and(body_partial_json(json!({
            "amount": 10654,
            "installments": 3,
            "billingAddress": { "zip_code": "88010000" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "ord_1" })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = PaymentGatewayClient::new(&config_for(&server));
    let order_id = gateway.charge(&charge_payload()).await.unwrap();
    assert_eq!(order_id, "ord_1");
}

#[tokio::test]
async fn charge_accepts_nested_and_numeric_ids() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments/charge"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": 4242 } })),
        )
        .mount(&server)
        .await;

    let gateway = PaymentGatewayClient::new(&config_for(&server));
    let order_id = gateway.charge(&charge_payload()).await.unwrap();
    assert_eq!(order_id, "4242");
}

#[tokio::test]
async fn charge_without_order_id_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments/charge"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let gateway = PaymentGatewayClient::new(&config_for(&server));
    let err = gateway.charge(&charge_payload()).await.unwrap_err();
    assert!(matches!(err, GatewayError::MissingOrderId));
}

#[tokio::test]
async fn charge_surfaces_api_errors_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments/charge"))
        .respond_with(ResponseTemplate::new(422).set_body_string("cartão recusado"))
        .mount(&server)
        .await;

    let gateway = PaymentGatewayClient::new(&config_for(&server));
    match gateway.charge(&charge_payload()).await.unwrap_err() {
        GatewayError::Api { status, body } => {
            assert_eq!(status, 422);
            assert_eq!(body, "cartão recusado");
        }
        other => panic!("esperava erro de API, veio {other:?}"),
    }
}

#[tokio::test]
async fn pix_unwraps_data_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments/pix"))
        .and(body_partial_json(json!({
            "amount": 9700,
            "customer": { "document": "52982030025" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "order_id": "pix_9",
                "copia_cola": "00020126580014br.gov.bcb.pix",
                "expires_at": 1_900_000_000_000u64
            }
        })))
        .mount(&server)
        .await;

    let gateway = PaymentGatewayClient::new(&config_for(&server));
    let quote = gateway
        .create_pix(&PixPayload {
            amount: 9700,
            description: "Cobrança Pix".to_string(),
            metadata: Map::new(),
            customer: PixCustomer {
                name: "Maria Souza".to_string(),
                document: "52982030025".to_string(),
            },
        })
        .await
        .unwrap();

    assert_eq!(quote.order_id.as_deref(), Some("pix_9"));
    assert_eq!(
        quote.copia_cola.as_deref(),
        Some("00020126580014br.gov.bcb.pix")
    );
    assert!(quote.expires_at.is_some());
}

#[tokio::test]
async fn status_reads_any_status_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/payments/status/ord_7"))
        .and(header("authorization", "Bearer tok_secreto"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "order_id": "ord_7",
            "charge_status": "PAID",
            "last_update": "2025-06-01T12:00:00Z"
        })))
        .mount(&server)
        .await;

    let gateway = PaymentGatewayClient::new(&config_for(&server));
    let status = gateway.status("ord_7").await.unwrap();
    assert_eq!(status.order_id, "ord_7");
    assert!(status.payload.normalized().is_approved());
}

// o tokenizador autentica pela chave pública, nunca pelo token do painel
struct SemAuthorization;

impl wiremock::Match for SemAuthorization {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

#[tokio::test]
async fn tokenizer_uses_public_key_query_only() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/core/v5/tokens"))
        .and(query_param("appId", "pk_test_123"))
        .and(SemAuthorization)
        .and(body_partial_json(json!({
            "type": "card",
            "card": { "number": "4111111111111111", "exp_year": "2030" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "token_xyz" })))
        .expect(1)
        .mount(&server)
        .await;

    let tokenizer = CardTokenizerClient::new(&config_for(&server));
    let token = tokenizer
        .tokenize(&CardData {
            number: "4111111111111111".to_string(),
            holder_name: "MARIA SOUZA".to_string(),
            exp_month: "12".to_string(),
            exp_year: "2030".to_string(),
            cvv: "123".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(token, "token_xyz");
}

#[tokio::test]
async fn tokenizer_rejection_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/core/v5/tokens"))
        .respond_with(ResponseTemplate::new(422).set_body_string("número inválido"))
        .mount(&server)
        .await;

    let tokenizer = CardTokenizerClient::new(&config_for(&server));
    let err = tokenizer
        .tokenize(&CardData {
            number: "1234".to_string(),
            holder_name: "MARIA".to_string(),
            exp_month: "12".to_string(),
            exp_year: "2030".to_string(),
            cvv: "123".to_string(),
        })
        .await
        .unwrap_err();

    match err {
        TokenizerError::Rejected { status, body } => {
            assert_eq!(status, 422);
            assert_eq!(body, "número inválido");
        }
        other => panic!("esperava rejeição, veio {other:?}"),
    }
}

#[tokio::test]
async fn tokenizer_requires_public_key_before_any_request() {
    let server = MockServer::start().await;
    // nenhum mock montado: qualquer chamada derrubaria o teste no expect

    let mut config = (*config_for(&server)).clone();
    config.pagarme_public_key = "   ".to_string();
    let tokenizer = CardTokenizerClient::new(&config);

    let err = tokenizer
        .tokenize(&CardData {
            number: "4111111111111111".to_string(),
            holder_name: "MARIA".to_string(),
            exp_month: "12".to_string(),
            exp_year: "2030".to_string(),
            cvv: "123".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TokenizerError::MissingPublicKey));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn tokenizer_empty_token_id_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/core/v5/tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "" })))
        .mount(&server)
        .await;

    let tokenizer = CardTokenizerClient::new(&config_for(&server));
    let err = tokenizer
        .tokenize(&CardData {
            number: "4111111111111111".to_string(),
            holder_name: "MARIA".to_string(),
            exp_month: "12".to_string(),
            exp_year: "2030".to_string(),
            cvv: "123".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TokenizerError::InvalidToken));
}

#[tokio::test]
async fn login_returns_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_partial_json(json!({
            "email": "maria@example.com",
            "password": "s3nha"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "access_token": "jwt_abc" })),
        )
        .mount(&server)
        .await;

    let auth = AuthClient::new(&config_for(&server));
    let token = auth.login("maria@example.com", "s3nha").await.unwrap();
    assert_eq!(token, "jwt_abc");
}

#[tokio::test]
async fn login_failure_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("credenciais inválidas"))
        .mount(&server)
        .await;

    let auth = AuthClient::new(&config_for(&server));
    match auth.login("maria@example.com", "errada").await.unwrap_err() {
        AuthError::Api { status, .. } => assert_eq!(status, 401),
        other => panic!("esperava erro de API, veio {other:?}"),
    }
}

#[tokio::test]
async fn register_sends_wire_names_and_returns_token() {
    let server = MockServer::start().await;
    // o painel espera lastName em camelCase
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_partial_json(json!({
            "name": "Maria",
            "lastName": "Souza",
            "email": "maria@example.com"
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "access_token": "jwt_novo" })),
        )
        .mount(&server)
        .await;

    let auth = AuthClient::new(&config_for(&server));
    let token = auth
        .register(&RegisterRequest {
            name: "Maria".to_string(),
            last_name: "Souza".to_string(),
            email: "maria@example.com".to_string(),
            password: "s3nha".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(token, "jwt_novo");
}

#[tokio::test]
async fn me_sends_bearer_and_parses_user() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("authorization", "Bearer jwt_abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "u_1",
            "name": "Maria",
            "email": "maria@example.com"
        })))
        .mount(&server)
        .await;

    let auth = AuthClient::new(&config_for(&server));
    let user = auth.me("jwt_abc").await.unwrap();
    assert_eq!(user.id.as_deref(), Some("u_1"));
    assert_eq!(user.name.as_deref(), Some("Maria"));
    assert_eq!(user.email, "maria@example.com");
}
