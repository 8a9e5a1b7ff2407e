use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::app::config::Config;
use crate::models::charge::{BillingAddress, ChargeCustomer, ChargePayload, PixCustomer, PixPayload};
use crate::models::pix::PixQuote;
use crate::models::session::{CardForm, CheckoutStep, ConfirmationState, CustomerForm, PayMethod};
use crate::services::confirmation;
use crate::services::gateway::{GatewayError, PaymentGatewayClient};
use crate::services::tokenizer::{CardData, CardTokenizerClient, TokenizerError};
use crate::utils::input::only_digits;
use crate::utils::money::{self, InstallmentOption};

pub type EventsTx = mpsc::UnboundedSender<CheckoutEvent>;

/// Eventos que a camada de apresentação consome.
#[derive(Debug, Clone)]
pub enum CheckoutEvent {
    StepChanged(CheckoutStep),
    QuoteReady(PixQuote),
    PixCountdown { seconds_left: u64 },
    PixExpired,
    /// Cobrança enviada, aguardando o gateway.
    Processing { order_id: String },
    Approved { order_id: String },
    Redirect { to: String },
    /// Falha terminal vinda dos canais de confirmação. O checkout volta
    /// para a etapa de pagamento e pode tentar de novo.
    Failed { message: String, retryable: bool },
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Validation(String),
    #[error("Validade inválida (use MM/AA)")]
    InvalidExpiry,
    #[error("Pagamento em andamento")]
    Busy,
    #[error("Sessão de pagamento encerrada")]
    Closed,
    #[error(transparent)]
    Tokenization(#[from] TokenizerError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Estado de uma sessão de checkout, do abrir do modal até fechar.
pub struct CheckoutSession {
    pub amount_cents: u64,
    pub metadata: Map<String, Value>,
    pub step: CheckoutStep,
    pub method: PayMethod,
    pub customer: CustomerForm,
    pub card: CardForm,
    pub installments: u32,
    pub paying: bool,
    pub quote_loading: bool,
    pub quote: Option<PixQuote>,
    pub pix_expired: bool,
    pub order_id: Option<String>,
    pub approved: bool,
    pub confirmation: ConfirmationState,
    pub closed: bool,
    // recursos vivos da sessão
    pub(crate) stop_tx: Option<watch::Sender<bool>>,
    pub(crate) push_task: Option<JoinHandle<()>>,
    pub(crate) poll_task: Option<JoinHandle<()>>,
    pub(crate) countdown_task: Option<JoinHandle<()>>,
    pub(crate) redirect_task: Option<JoinHandle<()>>,
}

impl CheckoutSession {
    pub fn new(amount_cents: u64, metadata: Map<String, Value>) -> Self {
        let options = money::installment_options(amount_cents);
        Self {
            amount_cents,
            metadata,
            step: CheckoutStep::MethodSelect,
            method: PayMethod::default(),
            customer: CustomerForm::default(),
            card: CardForm::default(),
            installments: money::validate_selection(&options, 1),
            paying: false,
            quote_loading: false,
            quote: None,
            pix_expired: false,
            order_id: None,
            approved: false,
            confirmation: ConfirmationState::default(),
            closed: false,
            stop_tx: None,
            push_task: None,
            poll_task: None,
            countdown_task: None,
            redirect_task: None,
        }
    }

    /// Canais de confirmação ainda vivos para este pedido?
    pub(crate) fn channels_alive_for(&self, order_id: &str) -> bool {
        match (&self.stop_tx, self.order_id.as_deref()) {
            (Some(stop), Some(current)) => current == order_id && !*stop.borrow(),
            _ => false,
        }
    }
}

/// Orquestrador do checkout. Um por sessão, dono do estado e dos clientes.
pub struct CheckoutFlow {
    config: Arc<Config>,
    gateway: Arc<PaymentGatewayClient>,
    tokenizer: Arc<CardTokenizerClient>,
    session: Arc<Mutex<CheckoutSession>>,
    events: EventsTx,
}

impl CheckoutFlow {
    /// Abre uma sessão para um valor em centavos. Devolve o fluxo e o
    /// receptor dos eventos de apresentação.
    pub fn open(
        config: Arc<Config>,
        amount_cents: u64,
        metadata: Map<String, Value>,
    ) -> (Self, mpsc::UnboundedReceiver<CheckoutEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let gateway = Arc::new(PaymentGatewayClient::new(&config));
        let tokenizer = Arc::new(CardTokenizerClient::new(&config));
        let session = Arc::new(Mutex::new(CheckoutSession::new(amount_cents, metadata)));

        let flow = Self {
            config,
            gateway,
            tokenizer,
            session,
            events,
        };
        (flow, rx)
    }

    pub fn step(&self) -> CheckoutStep {
        self.session.lock().step
    }

    pub fn method(&self) -> PayMethod {
        self.session.lock().method
    }

    pub fn is_paying(&self) -> bool {
        self.session.lock().paying
    }

    pub fn is_approved(&self) -> bool {
        self.session.lock().approved
    }

    pub fn order_id(&self) -> Option<String> {
        self.session.lock().order_id.clone()
    }

    pub fn quote(&self) -> Option<PixQuote> {
        self.session.lock().quote.clone()
    }

    pub fn confirmation(&self) -> ConfirmationState {
        self.session.lock().confirmation
    }

    /// A forma de pagamento é escolhida na primeira etapa.
    pub fn select_method(&self, method: PayMethod) -> Result<(), CheckoutError> {
        let mut s = self.session.lock();
        if s.closed {
            return Err(CheckoutError::Closed);
        }
        if s.step != CheckoutStep::MethodSelect {
            return Err(CheckoutError::Validation(
                "A forma de pagamento é escolhida na primeira etapa".to_string(),
            ));
        }
        s.method = method;
        Ok(())
    }

    pub fn set_customer(&self, customer: CustomerForm) {
        self.session.lock().customer = customer;
    }

    pub fn set_card(&self, card: CardForm) {
        self.session.lock().card = card;
    }

    /// Seleciona parcelas; escolhas fora da lista voltam para a primeira.
    pub fn set_installments(&self, count: u32) {
        let mut s = self.session.lock();
        let options = money::installment_options(s.amount_cents);
        s.installments = money::validate_selection(&options, count);
    }

    /// Troca o valor base e reavalia a parcela escolhida.
    pub fn set_amount(&self, amount_cents: u64) {
        let mut s = self.session.lock();
        s.amount_cents = amount_cents;
        let options = money::installment_options(amount_cents);
        s.installments = money::validate_selection(&options, s.installments);
    }

    pub fn installment_options(&self) -> Vec<InstallmentOption> {
        money::installment_options(self.session.lock().amount_cents)
    }

    /// Opção vigente, com taxa e total que vão para a cobrança.
    pub fn selected_option(&self) -> InstallmentOption {
        let s = self.session.lock();
        let options = money::installment_options(s.amount_cents);
        let selected = money::validate_selection(&options, s.installments);
        match options.iter().find(|opt| opt.count == selected) {
            Some(opt) => *opt,
            // a lista nunca é vazia
            None => options[0],
        }
    }

    /// Avança uma etapa. De dados para pagamento só com o formulário
    /// completo; no Pix a cobrança é gerada na entrada da etapa.
    pub async fn advance(&self) -> Result<CheckoutStep, CheckoutError> {
        let (step, method) = {
            let s = self.session.lock();
            if s.closed {
                return Err(CheckoutError::Closed);
            }
            (s.step, s.method)
        };

        let next = match step.forward() {
            Some(next) => next,
            None => {
                return Err(CheckoutError::Validation(
                    "Conclua o pagamento para continuar".to_string(),
                ))
            }
        };
        if next == CheckoutStep::PaymentSubmit {
            self.guard_customer_complete()?;
        }

        self.session.lock().step = next;
        let _ = self.events.send(CheckoutEvent::StepChanged(next));
        info!(step = next.number(), "checkout step");

        // Pix: entrar na etapa de pagamento gera a cobrança uma única vez
        if next == CheckoutStep::PaymentSubmit && method == PayMethod::Pix {
            let should_generate = {
                let s = self.session.lock();
                s.quote.is_none() && !s.quote_loading
            };
            if should_generate {
                self.generate_pix().await?;
            }
        }
        Ok(next)
    }

    /// Volta uma etapa. Indisponível na primeira e na confirmação.
    pub fn back(&self) -> Result<CheckoutStep, CheckoutError> {
        let prev = {
            let mut s = self.session.lock();
            if s.closed {
                return Err(CheckoutError::Closed);
            }
            let prev = match s.step.backward() {
                Some(prev) => prev,
                None => {
                    return Err(CheckoutError::Validation(
                        "Não dá para voltar desta etapa".to_string(),
                    ))
                }
            };
            s.step = prev;
            prev
        };
        let _ = self.events.send(CheckoutEvent::StepChanged(prev));
        Ok(prev)
    }

    fn guard_customer_complete(&self) -> Result<(), CheckoutError> {
        let s = self.session.lock();
        let c = &s.customer;
        let cpf_ok = only_digits(&c.cpf).len() == 11;
        let complete = match s.method {
            PayMethod::Pix => !c.name.trim().is_empty() && cpf_ok,
            PayMethod::Card => {
                !c.name.trim().is_empty()
                    && !c.email.trim().is_empty()
                    && cpf_ok
                    && only_digits(&c.phone).len() >= 10
                    && !c.street.trim().is_empty()
                    && !c.number.trim().is_empty()
                    && only_digits(&c.zip).len() == 8
                    && !c.city.trim().is_empty()
                    && c.uf.trim().len() == 2
                    && !c.country.trim().is_empty()
            }
        };
        if complete {
            Ok(())
        } else {
            Err(CheckoutError::Validation(match s.method {
                PayMethod::Pix => "Preencha nome e CPF (11 dígitos).".to_string(),
                PayMethod::Card => "Preencha os campos obrigatórios para continuar".to_string(),
            }))
        }
    }

    /// Paga com cartão: tokeniza, cria a cobrança com o total com taxa
    /// embutida e abre os canais de confirmação. Em erro a sessão fica na
    /// etapa de pagamento, pronta para tentar de novo.
    pub async fn submit_card(&self) -> Result<String, CheckoutError> {
        let (card, option) = {
            let s = self.session.lock();
            if s.closed {
                return Err(CheckoutError::Closed);
            }
            if s.step != CheckoutStep::PaymentSubmit {
                return Err(CheckoutError::Validation(
                    "Avance até a etapa de pagamento".to_string(),
                ));
            }
            if s.paying {
                return Err(CheckoutError::Busy);
            }

            let c = &s.customer;
            let filled = !c.name.trim().is_empty()
                && !c.email.trim().is_empty()
                && only_digits(&c.cpf).len() == 11
                && !s.card.number.trim().is_empty()
                && !s.card.holder.trim().is_empty()
                && !s.card.expiry.trim().is_empty()
                && !s.card.cvv.trim().is_empty();
            if !filled {
                return Err(CheckoutError::Validation(
                    "Preencha os dados do cartão para pagar".to_string(),
                ));
            }

            let options = money::installment_options(s.amount_cents);
            let selected = money::validate_selection(&options, s.installments);
            let option = options
                .iter()
                .find(|opt| opt.count == selected)
                .copied()
                .unwrap_or(options[0]);
            (s.card.clone(), option)
        };

        let exp = only_digits(&card.expiry);
        if exp.len() != 4 {
            return Err(CheckoutError::InvalidExpiry);
        }

        self.session.lock().paying = true;

        let result = self.tokenize_and_charge(&card, &exp, option).await;
        match result {
            Ok(order_id) => Ok(order_id),
            Err(e) => {
                let mut s = self.session.lock();
                if !s.closed {
                    s.paying = false;
                }
                Err(e)
            }
        }
    }

    async fn tokenize_and_charge(
        &self,
        card: &CardForm,
        exp: &str,
        option: InstallmentOption,
    ) -> Result<String, CheckoutError> {
        let token = self
            .tokenizer
            .tokenize(&CardData {
                number: only_digits(&card.number),
                holder_name: card.holder.clone(),
                exp_month: exp[..2].to_string(),
                exp_year: format!("20{}", &exp[2..]),
                cvv: only_digits(&card.cvv),
            })
            .await?;

        let payload = {
            let s = self.session.lock();
            // a sessão pode ter fechado durante a tokenização
            if s.closed {
                return Err(CheckoutError::Closed);
            }
            let c = &s.customer;
            let address = BillingAddress {
                street: c.street.clone(),
                number: c.number.clone(),
                complement: some_if_filled(&c.complement),
                neighborhood: some_if_filled(&c.neighborhood),
                zip_code: only_digits(&c.zip),
                city: c.city.clone(),
                state: c.uf.to_uppercase(),
                country: if c.country.is_empty() {
                    "BR".to_string()
                } else {
                    c.country.to_uppercase()
                },
            };

            // cobra já com a taxa do gateway embutida
            let mut metadata = s.metadata.clone();
            metadata.insert("fee_rate".to_string(), json!(option.rate()));
            metadata.insert("fee_cents".to_string(), json!(option.fee_cents));

            ChargePayload {
                amount: option.total_cents,
                card_token: token,
                installments: option.count,
                customer: ChargeCustomer {
                    name: c.name.clone(),
                    email: c.email.clone(),
                    document: only_digits(&c.cpf),
                    phone: only_digits(&c.phone),
                    address: address.clone(),
                },
                billing_address: address,
                description: description_from(&s.metadata, "Cobrança"),
                metadata,
            }
        };

        let order_id = self.gateway.charge(&payload).await?;
        // cobrança criada com a sessão já fechada: ninguém assina nada
        if self.session.lock().closed {
            return Err(CheckoutError::Closed);
        }
        info!(
            order_id = %order_id,
            amount = option.total_cents,
            installments = option.count,
            "charge created"
        );

        self.subscribe(&order_id, true);
        Ok(order_id)
    }

    /// Gera a cobrança Pix. Roda sozinho na entrada da etapa de pagamento
    /// e de novo quando o usuário pede um QR válido.
    pub async fn generate_pix(&self) -> Result<PixQuote, CheckoutError> {
        {
            let mut s = self.session.lock();
            if s.closed {
                return Err(CheckoutError::Closed);
            }
            if s.customer.name.trim().is_empty() || only_digits(&s.customer.cpf).len() != 11 {
                return Err(CheckoutError::Validation(
                    "Preencha nome e CPF (11 dígitos).".to_string(),
                ));
            }
            if s.quote_loading {
                debug!("pix generation already in flight");
                return Err(CheckoutError::Busy);
            }
            s.quote = None; // o QR anterior deixa de valer
            s.pix_expired = false;
            s.quote_loading = true;
        }
        self.stop_countdown();

        let payload = {
            let s = self.session.lock();
            PixPayload {
                amount: s.amount_cents,
                description: description_from(&s.metadata, "Cobrança Pix"),
                metadata: s.metadata.clone(),
                customer: PixCustomer {
                    name: s.customer.name.clone(),
                    document: only_digits(&s.customer.cpf),
                },
            }
        };

        let quote = match self.gateway.create_pix(&payload).await {
            Ok(quote) => quote,
            Err(e) => {
                let mut s = self.session.lock();
                if s.closed {
                    return Err(CheckoutError::Closed);
                }
                s.quote_loading = false;
                return Err(e.into());
            }
        };

        {
            let mut s = self.session.lock();
            // a sessão pode ter fechado enquanto o QR era emitido
            if s.closed {
                return Err(CheckoutError::Closed);
            }
            s.quote_loading = false;
            s.quote = Some(quote.clone());
        }

        // assina a confirmação mas continua na etapa do QR
        if let Some(order_id) = quote.order_id.clone() {
            self.subscribe(&order_id, false);
        }

        let _ = self.events.send(CheckoutEvent::QuoteReady(quote.clone()));

        if let Some(expiry_ms) = quote.expires_at.as_ref().and_then(|e| e.epoch_millis()) {
            self.start_countdown(expiry_ms);
        }
        Ok(quote)
    }

    fn subscribe(&self, order_id: &str, move_to_confirming: bool) {
        // o estado otimista entra antes dos canais abrirem: um status terminal
        // entregue de imediato nunca é atropelado por ele
        if move_to_confirming {
            {
                let mut s = self.session.lock();
                if s.closed {
                    return;
                }
                s.step = CheckoutStep::Confirming;
                s.approved = false;
                s.confirmation = ConfirmationState::AwaitingConfirmation;
            }
            let _ = self
                .events
                .send(CheckoutEvent::StepChanged(CheckoutStep::Confirming));
            let _ = self.events.send(CheckoutEvent::Processing {
                order_id: order_id.to_string(),
            });
        }
        confirmation::subscribe(
            &self.session,
            &self.gateway,
            &self.config,
            &self.events,
            order_id,
        );
    }

    fn start_countdown(&self, expiry_ms: i64) {
        self.stop_countdown();

        let session = self.session.clone();
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            loop {
                if session.lock().closed {
                    return;
                }
                let now = chrono::Utc::now().timestamp_millis();
                let seconds_left = ((expiry_ms - now).max(0) / 1000) as u64;
                let _ = events.send(CheckoutEvent::PixCountdown { seconds_left });
                if seconds_left == 0 {
                    session.lock().pix_expired = true;
                    let _ = events.send(CheckoutEvent::PixExpired);
                    return;
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        });
        let mut s = self.session.lock();
        if s.closed {
            drop(s);
            task.abort();
            return;
        }
        s.countdown_task = Some(task);
    }

    fn stop_countdown(&self) {
        if let Some(task) = self.session.lock().countdown_task.take() {
            task.abort();
        }
    }

    /// Encerra a sessão e derruba tudo que estiver vivo: stream, poll,
    /// contador e redirecionamento agendado.
    pub fn close(&self) {
        {
            let mut s = self.session.lock();
            if s.closed {
                return;
            }
            s.closed = true;
        }
        confirmation::teardown_channels(&self.session);
        self.stop_countdown();
        info!("checkout closed");
    }

    /// Volta ao estado de modal recém-aberto, mantendo valor e metadados.
    pub fn reset(&self) {
        confirmation::teardown_channels(&self.session);
        self.stop_countdown();
        let mut s = self.session.lock();
        let amount = s.amount_cents;
        let metadata = s.metadata.clone();
        *s = CheckoutSession::new(amount, metadata);
        debug!("checkout session reset");
    }
}

/// O nome do plano nos metadados vira a descrição da cobrança.
fn description_from(metadata: &Map<String, Value>, fallback: &str) -> String {
    metadata
        .get("plan")
        .and_then(Value::as_str)
        .filter(|plan| !plan.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

fn some_if_filled(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
