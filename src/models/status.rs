use serde::{Deserialize, Serialize};

/// Estado normalizado de um pedido.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderState {
    Pending,
    Paid,
    Failed,
    Canceled,
    Refused,
    Unknown(String),
}

impl OrderState {
    pub fn from_raw(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "paid" | "captured" | "approved" | "succeeded" => OrderState::Paid,
            "failed" => OrderState::Failed,
            "canceled" => OrderState::Canceled,
            "refused" => OrderState::Refused,
            "pending" => OrderState::Pending,
            other => OrderState::Unknown(other.to_string()),
        }
    }

    /// Pagamento confirmado pelo gateway.
    pub fn is_approved(&self) -> bool {
        matches!(self, OrderState::Paid)
    }

    /// Recusa definitiva; este pedido não vai mais ser pago.
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            OrderState::Failed | OrderState::Canceled | OrderState::Refused
        )
    }

    pub fn is_terminal(&self) -> bool {
        self.is_approved() || self.is_rejected()
    }
}

/// Corpo de um evento de status, vindo do stream ou do poll. Os backends
/// variam o nome do campo, então os três são aceitos.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge_status: Option<String>,
}

impl StatusPayload {
    /// Campo efetivo: status > order_status > charge_status.
    pub fn raw(&self) -> Option<&str> {
        self.status
            .as_deref()
            .or(self.order_status.as_deref())
            .or(self.charge_status.as_deref())
    }

    pub fn normalized(&self) -> OrderState {
        match self.raw() {
            Some(raw) => OrderState::from_raw(raw),
            None => OrderState::Unknown(String::new()),
        }
    }
}

/// Resposta do GET /payments/status/{order_id}.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatus {
    pub order_id: String,
    #[serde(flatten)]
    pub payload: StatusPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
}
