use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Expiração como o backend devolve: ISO-8601 ou epoch em milissegundos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpiresAt {
    Millis(i64),
    Iso(String),
}

impl ExpiresAt {
    /// Converte para epoch em milissegundos. Valores não interpretáveis
    /// viram `None` e o contador simplesmente não inicia.
    pub fn epoch_millis(&self) -> Option<i64> {
        match self {
            ExpiresAt::Millis(ms) => Some(*ms),
            ExpiresAt::Iso(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.timestamp_millis())
                .ok()
                .or_else(|| {
                    s.parse::<NaiveDateTime>()
                        .map(|ndt| ndt.and_utc().timestamp_millis())
                        .ok()
                }),
        }
    }
}

/// Cobrança Pix devolvida pelo gateway. Os campos são todos opcionais
/// porque o backend nem sempre preenche o QR e a expiração juntos.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PixQuote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copia_cola: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<ExpiresAt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expires_at_from_millis() {
        let exp = ExpiresAt::Millis(1_735_689_600_000);
        assert_eq!(exp.epoch_millis(), Some(1_735_689_600_000));
    }

    #[test]
    fn test_expires_at_from_iso() {
        let exp = ExpiresAt::Iso("2025-01-01T00:00:00Z".to_string());
        assert_eq!(exp.epoch_millis(), Some(1_735_689_600_000));

        let with_offset = ExpiresAt::Iso("2025-01-01T00:00:00-03:00".to_string());
        assert_eq!(with_offset.epoch_millis(), Some(1_735_700_400_000));
    }

    #[test]
    fn test_expires_at_invalid() {
        let exp = ExpiresAt::Iso("amanhã".to_string());
        assert_eq!(exp.epoch_millis(), None);
    }

    #[test]
    fn test_quote_deserializes_both_expiry_shapes() {
        let by_iso: PixQuote = serde_json::from_str(
            r#"{"order_id":"ord_1","copia_cola":"000201","expires_at":"2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(
            by_iso.expires_at,
            Some(ExpiresAt::Iso("2025-01-01T00:00:00Z".to_string()))
        );

        let by_millis: PixQuote =
            serde_json::from_str(r#"{"order_id":"ord_2","expires_at":1735689600000}"#).unwrap();
        assert_eq!(by_millis.expires_at, Some(ExpiresAt::Millis(1_735_689_600_000)));
        assert_eq!(by_millis.qr_code_base64, None);
    }
}
