/// Etapas do checkout, na ordem em que o modal as mostra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckoutStep {
    MethodSelect = 1,
    CustomerInfo = 2,
    PaymentSubmit = 3,
    Confirming = 4,
}

impl CheckoutStep {
    pub fn number(self) -> u8 {
        self as u8
    }

    /// Etapa seguinte no avanço manual. A confirmação só é alcançada pela
    /// submissão de um pagamento, nunca pelo botão de avançar.
    pub fn forward(self) -> Option<CheckoutStep> {
        match self {
            CheckoutStep::MethodSelect => Some(CheckoutStep::CustomerInfo),
            CheckoutStep::CustomerInfo => Some(CheckoutStep::PaymentSubmit),
            CheckoutStep::PaymentSubmit | CheckoutStep::Confirming => None,
        }
    }

    pub fn backward(self) -> Option<CheckoutStep> {
        match self {
            CheckoutStep::MethodSelect => None,
            CheckoutStep::CustomerInfo => Some(CheckoutStep::MethodSelect),
            CheckoutStep::PaymentSubmit => Some(CheckoutStep::CustomerInfo),
            CheckoutStep::Confirming => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CheckoutStep::MethodSelect => "Forma de pagamento",
            CheckoutStep::CustomerInfo => "Seus dados",
            CheckoutStep::PaymentSubmit => "Pagamento",
            CheckoutStep::Confirming => "Confirmação",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayMethod {
    #[default]
    Card,
    Pix,
}

/// Sub-estado da etapa de confirmação.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmationState {
    #[default]
    Idle,
    /// Cobrança enviada, aguardando o gateway confirmar.
    AwaitingConfirmation,
    Approved,
}

/// Campos do cliente como digitados. A normalização (dígitos, maiúsculas)
/// acontece na montagem do payload.
#[derive(Debug, Clone)]
pub struct CustomerForm {
    pub name: String,
    pub cpf: String,
    pub email: String,
    pub phone: String,
    pub street: String,
    pub number: String,
    pub complement: String,
    pub neighborhood: String,
    pub zip: String,
    pub city: String,
    pub uf: String,
    pub country: String,
}

impl Default for CustomerForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            cpf: String::new(),
            email: String::new(),
            phone: String::new(),
            street: String::new(),
            number: String::new(),
            complement: String::new(),
            neighborhood: String::new(),
            zip: String::new(),
            city: String::new(),
            uf: "SC".to_string(),
            country: "BR".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CardForm {
    pub number: String,
    pub holder: String,
    /// Validade como digitada, MM/AA ou MMAA.
    pub expiry: String,
    pub cvv: String,
}
