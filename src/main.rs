use std::io::Write;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;

use cobranca::app::config::Config;
use cobranca::models::plan::{find_plan, PLANS};
use cobranca::models::session::{CardForm, CustomerForm, PayMethod};
use cobranca::services::auth::AuthClient;
use cobranca::services::checkout::{CheckoutEvent, CheckoutFlow};
use cobranca::services::gateway::PaymentGatewayClient;
use cobranca::utils::input::{format_expiry, mask_cpf};
use cobranca::utils::money::format_brl;

#[derive(Parser)]
#[command(name = "cobranca", version, about = "Checkout de assinatura: cartão e Pix")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lista os planos disponíveis
    Plans,
    /// Autentica no painel e imprime o token de acesso
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Executa um checkout completo
    #[command(subcommand)]
    Pay(PayCommand),
    /// Consulta o status de um pedido no gateway
    Status { order_id: String },
}

#[derive(Subcommand)]
enum PayCommand {
    /// Pagamento com cartão de crédito
    Card(CardArgs),
    /// Pagamento com Pix
    Pix(PixArgs),
}

#[derive(Args)]
struct OrderArgs {
    /// Código do plano (iniciante, profissional, elite)
    #[arg(long, conflicts_with = "amount")]
    plan: Option<String>,
    /// Valor avulso em centavos
    #[arg(long)]
    amount: Option<u64>,
    /// Nome completo do titular
    #[arg(long)]
    name: String,
    /// CPF (com ou sem máscara)
    #[arg(long)]
    cpf: String,
}

#[derive(Args)]
struct CardArgs {
    #[command(flatten)]
    order: OrderArgs,
    #[arg(long)]
    email: String,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    street: String,
    #[arg(long)]
    number: String,
    #[arg(long, default_value = "")]
    complement: String,
    #[arg(long, default_value = "")]
    neighborhood: String,
    /// CEP (8 dígitos)
    #[arg(long)]
    zip: String,
    #[arg(long)]
    city: String,
    #[arg(long, default_value = "SC")]
    uf: String,
    #[arg(long, default_value = "BR")]
    country: String,
    #[arg(long)]
    card_number: String,
    #[arg(long)]
    card_holder: String,
    /// Validade MM/AA
    #[arg(long)]
    card_expiry: String,
    #[arg(long)]
    card_cvv: String,
    /// Número de parcelas (1 a 12)
    #[arg(long, default_value_t = 1)]
    installments: u32,
}

#[derive(Args)]
struct PixArgs {
    #[command(flatten)]
    order: OrderArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Arc::new(Config::from_env());
    config.validate().context("configuração inválida")?;

    let cli = Cli::parse();
    match cli.command {
        Command::Plans => {
            list_plans();
            Ok(())
        }
        Command::Login { email, password } => {
            let auth = AuthClient::new(&config);
            let token = auth.login(&email, &password).await?;
            println!("{token}");
            Ok(())
        }
        Command::Pay(PayCommand::Card(args)) => pay_card(config, args).await,
        Command::Pay(PayCommand::Pix(args)) => pay_pix(config, args).await,
        Command::Status { order_id } => {
            let gateway = PaymentGatewayClient::new(&config);
            let status = gateway.status(&order_id).await?;
            println!(
                "Pedido {}: {}",
                status.order_id,
                status.payload.raw().unwrap_or("sem status")
            );
            Ok(())
        }
    }
}

fn list_plans() {
    for plan in &PLANS {
        let marker = if plan.highlight { " *" } else { "" };
        let visitors = plan
            .monthly_visitors
            .map(|v| format!("{} visitantes/mês", v))
            .unwrap_or_else(|| "visitantes ilimitados".to_string());
        let domains = plan
            .domains
            .map(|d| format!("{} domínios", d))
            .unwrap_or_else(|| "domínios ilimitados".to_string());
        println!(
            "{:<14} {}  {} - {}, {}{}",
            plan.code,
            plan.name,
            format_brl(plan.price_cents),
            visitors,
            domains,
            marker
        );
    }
}

fn resolve_order(order: &OrderArgs) -> anyhow::Result<(u64, Map<String, Value>)> {
    let mut metadata = Map::new();
    match (&order.plan, order.amount) {
        (Some(code), _) => {
            let plan =
                find_plan(code).ok_or_else(|| anyhow::anyhow!("plano desconhecido: {code}"))?;
            metadata.insert("plan".to_string(), json!(plan.name));
            Ok((plan.price_cents, metadata))
        }
        (None, Some(amount)) => {
            if amount == 0 {
                bail!("o valor precisa ser maior que zero");
            }
            Ok((amount, metadata))
        }
        (None, None) => bail!("informe --plan ou --amount"),
    }
}

async fn pay_card(config: Arc<Config>, args: CardArgs) -> anyhow::Result<()> {
    let (amount, metadata) = resolve_order(&args.order)?;
    let (flow, rx) = CheckoutFlow::open(config, amount, metadata);

    flow.advance().await?;
    println!(
        "Pagador: {} (CPF {})",
        args.order.name,
        mask_cpf(&args.order.cpf)
    );
    flow.set_customer(CustomerForm {
        name: args.order.name,
        cpf: args.order.cpf,
        email: args.email,
        phone: args.phone,
        street: args.street,
        number: args.number,
        complement: args.complement,
        neighborhood: args.neighborhood,
        zip: args.zip,
        city: args.city,
        uf: args.uf,
        country: args.country,
    });
    flow.advance().await?;

    println!("Opções de parcelamento:");
    for opt in flow.installment_options() {
        println!(
            "  {:>2}x de {} (total {})",
            opt.count,
            format_brl(opt.per_installment_cents),
            format_brl(opt.total_cents)
        );
    }

    flow.set_installments(args.installments);
    let option = flow.selected_option();
    let rate = format!("{:.2}", option.rate_percent()).replace('.', ",");
    println!(
        "Cobrança: {} + taxa de {rate}% ({}) = {} em {}x de {}",
        format_brl(amount),
        format_brl(option.fee_cents),
        format_brl(option.total_cents),
        option.count,
        format_brl(option.per_installment_cents)
    );

    println!(
        "Cartão de {}, validade {}",
        args.card_holder,
        format_expiry(&args.card_expiry)
    );
    flow.set_card(CardForm {
        number: args.card_number,
        holder: args.card_holder,
        expiry: args.card_expiry,
        cvv: args.card_cvv,
    });
    let order_id = flow.submit_card().await?;
    println!("Pedido {order_id} criado.");

    consume_events(&flow, rx).await
}

async fn pay_pix(config: Arc<Config>, args: PixArgs) -> anyhow::Result<()> {
    let (amount, metadata) = resolve_order(&args.order)?;
    let (flow, rx) = CheckoutFlow::open(config, amount, metadata);

    flow.select_method(PayMethod::Pix)?;
    flow.advance().await?;
    println!(
        "Pagador: {} (CPF {})",
        args.order.name,
        mask_cpf(&args.order.cpf)
    );
    flow.set_customer(CustomerForm {
        name: args.order.name,
        cpf: args.order.cpf,
        ..CustomerForm::default()
    });
    // entrar na etapa de pagamento já gera a cobrança Pix
    flow.advance().await?;

    consume_events(&flow, rx).await
}

/// Consome os eventos da sessão até redirecionar, falhar ou o usuário
/// interromper com Ctrl-C.
async fn consume_events(
    flow: &CheckoutFlow,
    mut rx: mpsc::UnboundedReceiver<CheckoutEvent>,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nEncerrando o checkout...");
                flow.close();
                process::exit(130);
            }
            event = rx.recv() => match event {
                Some(CheckoutEvent::StepChanged(step)) => {
                    println!("Etapa {}: {}", step.number(), step.label());
                }
                Some(CheckoutEvent::QuoteReady(quote)) => {
                    if let Some(code) = &quote.copia_cola {
                        println!("Pix copia e cola:\n{code}");
                    }
                    if let Some(qr) = &quote.qr_code_base64 {
                        println!("QR code (base64): {qr}");
                    }
                }
                Some(CheckoutEvent::PixCountdown { seconds_left }) => {
                    print!("\rExpira em {:02}:{:02} ", seconds_left / 60, seconds_left % 60);
                    let _ = std::io::stdout().flush();
                }
                Some(CheckoutEvent::PixExpired) => {
                    println!("\nO código Pix expirou. Gere um novo para pagar.");
                    flow.close();
                    bail!("pagamento não concluído");
                }
                Some(CheckoutEvent::Processing { order_id }) => {
                    println!("Aguardando confirmação do pedido {order_id}...");
                }
                Some(CheckoutEvent::Approved { order_id }) => {
                    println!("Pagamento aprovado! Pedido {order_id}.");
                }
                Some(CheckoutEvent::Redirect { to }) => {
                    println!("Redirecionando para {to}");
                    flow.close();
                    return Ok(());
                }
                Some(CheckoutEvent::Failed { message, .. }) => {
                    eprintln!("{message}");
                    flow.close();
                    bail!("pagamento não concluído");
                }
                None => bail!("sessão encerrada sem confirmação"),
            }
        }
    }
}
