// Utilitários para valores monetários e parcelamento

/// Máximo de parcelas oferecidas no checkout.
pub const MAX_INSTALLMENTS: u32 = 12;

/// Valor mínimo de uma parcela, em centavos.
pub const MIN_INSTALLMENT_CENTS: u64 = 500;

// Taxa por quantidade de parcelas, em basis points (1 bp = 0,01%).
const RATE_TABLE_BP: [(u32, u32); 12] = [
    (1, 559),
    (2, 859),
    (3, 984),
    (4, 1109),
    (5, 1234),
    (6, 1359),
    (7, 1534),
    (8, 1659),
    (9, 1784),
    (10, 1909),
    (11, 2034),
    (12, 2159),
];

/// Uma opção de parcelamento com a taxa já embutida no total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallmentOption {
    pub count: u32,
    pub rate_bp: u32,
    pub fee_cents: u64,
    pub total_cents: u64,
    pub per_installment_cents: u64,
}

impl InstallmentOption {
    /// Taxa como fração (984 bp -> 0.0984), o formato dos metadados da cobrança.
    pub fn rate(&self) -> f64 {
        self.rate_bp as f64 / 10_000.0
    }

    /// Taxa em porcentagem, para exibição.
    pub fn rate_percent(&self) -> f64 {
        self.rate_bp as f64 / 100.0
    }

    fn build(amount_cents: u64, count: u32) -> Self {
        let rate_bp = rate_for(count);
        let fee_cents = calculate_fee(amount_cents, rate_bp);
        let total_cents = amount_cents + fee_cents;
        let per_installment_cents = div_round(total_cents, count as u64);
        Self {
            count,
            rate_bp,
            fee_cents,
            total_cents,
            per_installment_cents,
        }
    }
}

/// Taxa em basis points para uma quantidade de parcelas. Fora da tabela, zero.
pub fn rate_for(count: u32) -> u32 {
    RATE_TABLE_BP
        .iter()
        .find(|(c, _)| *c == count)
        .map(|(_, bp)| *bp)
        .unwrap_or(0)
}

/// Taxa sobre o valor base, arredondamento half-up exato.
pub fn calculate_fee(amount_cents: u64, rate_bp: u32) -> u64 {
    (amount_cents * rate_bp as u64 + 5_000) / 10_000
}

fn div_round(n: u64, d: u64) -> u64 {
    (n + d / 2) / d
}

/// Opções de parcelamento para um valor base. Parcelas abaixo do mínimo são
/// descartadas; se nada sobrar, devolve só a opção à vista, sem filtro.
pub fn installment_options(amount_cents: u64) -> Vec<InstallmentOption> {
    let options: Vec<InstallmentOption> = (1..=MAX_INSTALLMENTS)
        .map(|count| InstallmentOption::build(amount_cents, count))
        .filter(|opt| opt.per_installment_cents >= MIN_INSTALLMENT_CENTS)
        .collect();

    if options.is_empty() {
        return vec![InstallmentOption::build(amount_cents, 1)];
    }
    options
}

/// Reavalia a parcela escolhida quando as opções mudam. Se ela não existir
/// mais, volta para a primeira opção da lista.
pub fn validate_selection(options: &[InstallmentOption], selected: u32) -> u32 {
    if options.iter().any(|opt| opt.count == selected) {
        selected
    } else {
        options.first().map(|opt| opt.count).unwrap_or(1)
    }
}

/// Formata centavos como BRL: 123456 -> "R$ 1.234,56".
pub fn format_brl(amount_cents: u64) -> String {
    let reais = amount_cents / 100;
    let centavos = amount_cents % 100;

    let digits = reais.to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let grouped: String = grouped.chars().rev().collect();

    format!("R$ {},{:02}", grouped, centavos)
}
