use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Endereço de cobrança no formato que o gateway espera.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingAddress {
    pub street: String,
    pub number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    pub zip_code: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeCustomer {
    pub name: String,
    pub email: String,
    pub document: String,
    pub phone: String,
    pub address: BillingAddress,
}

// Payload do POST /payments/charge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargePayload {
    pub amount: u64,
    pub card_token: String,
    pub installments: u32,
    pub customer: ChargeCustomer,
    #[serde(rename = "billingAddress")]
    pub billing_address: BillingAddress,
    pub metadata: Map<String, Value>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixCustomer {
    pub name: String,
    pub document: String,
}

// Payload do POST /payments/pix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixPayload {
    pub amount: u64,
    pub description: String,
    pub metadata: Map<String, Value>,
    pub customer: PixCustomer,
}
